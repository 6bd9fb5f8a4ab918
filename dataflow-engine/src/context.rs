// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Context
//!
//! Everything a stage-graph needs to process one run (§4.2): the resolved
//! run metadata, a cancellation signal every worker checks cooperatively,
//! and the shared handles to the tracker, resource cache, and artifact
//! batcher that [`crate::factories::EngineFactory`] wires up per run.

use std::sync::Arc;

use dataflow_core::{EngineResult, ProgressPersistence, RunId, RunMetadata};
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::artifact::batcher::ArtifactBatcher;
use crate::context_pool::ContextPool;
use crate::infrastructure::config::EngineConfig;
use crate::progress::tracker::ProgressTracker;
use crate::resource_cache::ResourceRunCache;

pub struct Context {
    pub run_id: RunId,
    pub metadata: RunMetadata,
    pub cancel_token: CancellationToken,
    pub progress_tracker: Arc<ProgressTracker>,
    pub resource_cache: Arc<ResourceRunCache>,
    pub artifact_batcher: Arc<ArtifactBatcher>,
    pub context_pool: Arc<ContextPool>,
    pub persistence: Arc<dyn ProgressPersistence>,
    pub config: Arc<EngineConfig>,
    pub run_span: Span,
}

impl Context {
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The outcome of draining a stage graph to completion (§4.4 `execute`).
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub status: dataflow_core::RunStatus,
    pub counts: dataflow_core::RunCounts,
}

pub async fn finalize_run(ctx: &Context) -> EngineResult<RunOutcome> {
    ctx.progress_tracker.finalize(&ctx.context_pool, ctx.persistence.as_ref()).await?;
    ctx.artifact_batcher.finalize().await;

    let snapshot = ctx.progress_tracker.snapshot();
    let status = if ctx.is_cancelled() {
        dataflow_core::RunStatus::Cancelled
    } else if snapshot.failed > 0 {
        dataflow_core::RunStatus::Failed
    } else {
        dataflow_core::RunStatus::Completed
    };

    let _lease = ctx.context_pool.acquire().await?;
    let run = ctx.persistence.complete_run(ctx.run_id, status).await?;
    Ok(RunOutcome {
        run_id: ctx.run_id,
        status: run.status,
        counts: run.counts,
    })
}
