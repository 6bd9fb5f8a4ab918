// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Factory (C11)
//!
//! Composes one [`Context`] per run from [`EngineConfig`]: creates the
//! durable run row, builds a fresh [`ProgressTracker`] and
//! [`ResourceRunCache`], spawns the artifact batcher and persistence
//! flusher, and leases a [`ContextPool`]. Everything a stage graph touches
//! is reachable only through the returned `Arc<Context>` — no global
//! state survives between runs started from the same factory.

use std::sync::Arc;

use dataflow_core::{ArtifactStorageAdapter, EngineResult, ProgressPersistence, RunMetadata};
use tokio_util::sync::CancellationToken;

use crate::artifact::{ArtifactBatcher, ArtifactBatcherConfig};
use crate::context::Context;
use crate::context_pool::ContextPool;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::logging::run_span;
use crate::persistence::PersistenceFlusher;
use crate::progress::tracker::ProgressTracker;
use crate::resource_cache::{DuplicatePolicy, ResourceRunCache};

/// Holds the background tasks a [`Context`] depends on but does not own
/// directly, so a caller can shut them down in the right order once the
/// stage graph built on top of the context has finished draining.
pub struct EngineHandle {
    pub context: Arc<Context>,
    flusher: PersistenceFlusher,
}

impl EngineHandle {
    /// Stops the periodic persistence flusher. Call after the stage graph's
    /// `execute()` has returned — `execute()` already runs the tracker's
    /// own synchronous final flush via `finalize_run`, so this only stops
    /// the background ticker from racing a second context for the same run.
    pub async fn shutdown(self) {
        self.context.cancel_token.cancel();
        self.flusher.shutdown().await;
    }
}

pub struct EngineFactory {
    config: Arc<EngineConfig>,
    persistence: Arc<dyn ProgressPersistence>,
    artifact_storage: Arc<dyn ArtifactStorageAdapter>,
    duplicate_policy: DuplicatePolicy,
}

impl EngineFactory {
    pub fn new(
        config: EngineConfig,
        persistence: Arc<dyn ProgressPersistence>,
        artifact_storage: Arc<dyn ArtifactStorageAdapter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            persistence,
            artifact_storage,
            duplicate_policy: DuplicatePolicy::Reject,
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Starts a new run: writes its `pipeline_runs` row, then wires up a
    /// fresh tracker, cache, artifact batcher, and flusher behind a single
    /// [`Context`].
    pub async fn start_run(&self, metadata: RunMetadata) -> EngineResult<EngineHandle> {
        let run = self.persistence.create_run(metadata.clone()).await?;
        let run_id = run.run_id;

        let cache = Arc::new(ResourceRunCache::new(self.duplicate_policy));
        let tracker = Arc::new(ProgressTracker::new(run_id, cache.clone(), self.config.persistence.max_deferred_retries));
        let context_pool = Arc::new(ContextPool::new(self.config.context_pool.size));
        let cancel_token = CancellationToken::new();

        let artifact_batcher = ArtifactBatcher::spawn(
            run_id,
            self.artifact_storage.clone(),
            ArtifactBatcherConfig {
                batch_size: self.config.artifact_batcher.batch_size,
                flush_interval: self.config.artifact_flush_interval(),
                high_water_mark: self.config.artifact_batcher.high_water_mark,
            },
        );

        let flusher = PersistenceFlusher::spawn(
            tracker.clone(),
            self.persistence.clone(),
            context_pool.clone(),
            self.config.persistence_flush_interval(),
            cancel_token.clone(),
        );

        let span = run_span(run_id, &run.category, &run.name);

        let context = Arc::new(Context {
            run_id,
            metadata,
            cancel_token,
            progress_tracker: tracker,
            resource_cache: cache,
            artifact_batcher,
            context_pool,
            persistence: self.persistence.clone(),
            config: self.config.clone(),
            run_span: span,
        });

        Ok(EngineHandle { context, flusher })
    }
}
