// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Artifact Batcher
//!
//! A queue plus a background flush worker (§4.8). A `with-artifact` stage
//! enqueues a save request and keeps moving; the batcher accumulates
//! requests and hands them to the storage adapter in batches, either when
//! `batch_size` is reached or `flush_interval` elapses, whichever comes
//! first. The channel's own capacity (`high_water_mark`) is the
//! back-pressure mechanism — `enqueue` suspends the caller once the
//! channel is full, exactly like every other stage boundary in this engine.

use std::sync::Arc;
use std::time::Duration;

use dataflow_core::{ArtifactSaveOutcome, ArtifactSaveRequest, ArtifactStorageAdapter, RunId};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ArtifactBatcherConfig {
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub high_water_mark: usize,
}

impl Default for ArtifactBatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_interval: Duration::from_millis(500),
            high_water_mark: 1000,
        }
    }
}

struct QueueItem {
    request: ArtifactSaveRequest,
    completion: Option<oneshot::Sender<ArtifactSaveOutcome>>,
}

pub struct ArtifactBatcher {
    tx: tokio::sync::Mutex<Option<mpsc::Sender<QueueItem>>>,
    worker: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ArtifactBatcher {
    pub fn spawn(run_id: RunId, storage: Arc<dyn ArtifactStorageAdapter>, config: ArtifactBatcherConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(config.high_water_mark.max(1));
        let worker = tokio::spawn(Self::run_worker(run_id, storage, config, rx));
        Arc::new(Self {
            tx: tokio::sync::Mutex::new(Some(tx)),
            worker: tokio::sync::Mutex::new(Some(worker)),
        })
    }

    /// Fire-and-forget enqueue; suspends if the queue is at its
    /// high-water-mark. A no-op once [`Self::finalize`] has closed the
    /// queue.
    pub async fn enqueue(&self, request: ArtifactSaveRequest) {
        if let Some(tx) = self.tx.lock().await.as_ref() {
            let _ = tx.send(QueueItem { request, completion: None }).await;
        }
    }

    /// Enqueues a request and returns a receiver resolved once the batch
    /// containing it has been written.
    pub async fn enqueue_with_confirmation(&self, request: ArtifactSaveRequest) -> oneshot::Receiver<ArtifactSaveOutcome> {
        let (completion_tx, completion_rx) = oneshot::channel();
        if let Some(tx) = self.tx.lock().await.as_ref() {
            let _ = tx
                .send(QueueItem {
                    request,
                    completion: Some(completion_tx),
                })
                .await;
        }
        completion_rx
    }

    /// Closes the queue and waits for the worker to drain and flush every
    /// remaining request.
    pub async fn finalize(&self) {
        self.tx.lock().await.take();
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
    }

    async fn run_worker(
        run_id: RunId,
        storage: Arc<dyn ArtifactStorageAdapter>,
        config: ArtifactBatcherConfig,
        mut rx: mpsc::Receiver<QueueItem>,
    ) {
        let mut buffer: Vec<QueueItem> = Vec::with_capacity(config.batch_size);
        let mut ticker = tokio::time::interval(config.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                item = rx.recv() => {
                    match item {
                        Some(item) => {
                            buffer.push(item);
                            if buffer.len() >= config.batch_size {
                                Self::flush(run_id, &storage, &mut buffer).await;
                            }
                        }
                        None => {
                            Self::flush(run_id, &storage, &mut buffer).await;
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        Self::flush(run_id, &storage, &mut buffer).await;
                    }
                }
            }
        }
    }

    async fn flush(run_id: RunId, storage: &Arc<dyn ArtifactStorageAdapter>, buffer: &mut Vec<QueueItem>) {
        if buffer.is_empty() {
            return;
        }
        let drained: Vec<QueueItem> = std::mem::take(buffer);
        let requests: Vec<ArtifactSaveRequest> = drained.iter().map(|item| item.request.clone()).collect();
        let outcomes = storage.save_batch(run_id, &requests).await;
        for (item, outcome) in drained.into_iter().zip(outcomes.into_iter()) {
            if !outcome.success {
                warn!(
                    artifact = %item.request.artifact_name,
                    error = ?outcome.error_message,
                    "artifact save failed"
                );
            }
            if let Some(completion) = item.completion {
                let _ = completion.send(outcome);
            }
        }
    }
}
