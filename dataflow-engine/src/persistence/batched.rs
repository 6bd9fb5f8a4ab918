// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Persistence Flusher
//!
//! A background `tokio::time::interval` task that periodically drains the
//! [`ProgressTracker`]'s pending-write queues into a [`ProgressPersistence`]
//! implementation, bounded by a [`ContextPool`] lease (§4.6 supplement).
//! The tracker stays the only structure stage workers touch on the hot
//! path; this task is the only thing that ever calls into the store on
//! the tracker's behalf before [`ProgressTracker::finalize`] runs the last,
//! synchronous drain at the end of the run.

use std::sync::Arc;
use std::time::Duration;

use dataflow_core::ProgressPersistence;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::context_pool::ContextPool;
use crate::progress::tracker::ProgressTracker;

pub struct PersistenceFlusher {
    handle: JoinHandle<()>,
}

impl PersistenceFlusher {
    pub fn spawn(
        tracker: Arc<ProgressTracker>,
        persistence: Arc<dyn ProgressPersistence>,
        pool: Arc<ContextPool>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = tracker.flush(&pool, persistence.as_ref()).await {
                            warn!(error = %err, "periodic progress flush failed, will retry next tick");
                        }
                    }
                }
            }
        });
        Self { handle }
    }

    pub async fn shutdown(self) {
        // The spawning caller cancels the shared `CancellationToken` before
        // calling this; we just wait for the loop to observe it and return.
        let _ = self.handle.await;
    }
}
