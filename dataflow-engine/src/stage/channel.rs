// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Channels
//!
//! Stages are connected by Tokio mpsc channels (§4.3 supplement). A
//! `bounded-capacity` of `Some(n)` gives the standard bounded channel,
//! whose `send().await` is exactly the back-pressure suspension point
//! required by §5(d); `None` (unbounded capacity) uses Tokio's unbounded
//! channel. Wrapping both in one small enum keeps the stage worker loops
//! free of capacity-kind branching.

use tokio::sync::mpsc;

pub enum StageSender<T> {
    Bounded(mpsc::Sender<T>),
    Unbounded(mpsc::UnboundedSender<T>),
}

impl<T> Clone for StageSender<T> {
    fn clone(&self) -> Self {
        match self {
            StageSender::Bounded(tx) => StageSender::Bounded(tx.clone()),
            StageSender::Unbounded(tx) => StageSender::Unbounded(tx.clone()),
        }
    }
}

impl<T: Send> StageSender<T> {
    /// Sends a value, suspending the caller if the downstream buffer is
    /// full. Returns `Err` only once the receiver has been dropped, which
    /// happens when the downstream stage has shut down (e.g. cancellation
    /// propagated ahead of us) — callers treat that as "stop producing",
    /// not as a fatal error.
    pub async fn send(&self, value: T) -> Result<(), T> {
        match self {
            StageSender::Bounded(tx) => tx.send(value).await.map_err(|e| e.0),
            StageSender::Unbounded(tx) => tx.send(value).map_err(|e| e.0),
        }
    }
}

pub enum StageReceiver<T> {
    Bounded(mpsc::Receiver<T>),
    Unbounded(mpsc::UnboundedReceiver<T>),
}

impl<T> StageReceiver<T> {
    pub async fn recv(&mut self) -> Option<T> {
        match self {
            StageReceiver::Bounded(rx) => rx.recv().await,
            StageReceiver::Unbounded(rx) => rx.recv().await,
        }
    }
}

/// The capacity a stage's output buffer is configured with (§4.4).
#[derive(Debug, Clone, Copy)]
pub enum Capacity {
    Bounded(usize),
    Unbounded,
}

pub fn make_channel<T: Send + 'static>(capacity: Capacity) -> (StageSender<T>, StageReceiver<T>) {
    match capacity {
        Capacity::Bounded(n) => {
            let (tx, rx) = mpsc::channel(n.max(1));
            (StageSender::Bounded(tx), StageReceiver::Bounded(rx))
        }
        Capacity::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (StageSender::Unbounded(tx), StageReceiver::Unbounded(rx))
        }
    }
}
