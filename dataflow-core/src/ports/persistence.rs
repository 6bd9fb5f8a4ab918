// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Progress Persistence Port
//!
//! The durable store for runs, resource-runs, and step-progress (§4.6).
//! Every operation here is a bulk operation: the tracker never writes a
//! single row at a time, so an implementation can batch each call into one
//! transaction.
//!
//! ## Design Principles
//!
//! - **Bulk-only**: no `update_single_resource_run`; callers accumulate
//!   updates and submit them together.
//! - **Idempotent**: a duplicate `(run_id, resource_id)` or
//!   `(resource_run_id, sequence)` insert is silently skipped, not an
//!   error — retried batches after a transient failure are safe to resend.
//! - **Deferred, not failed**: a step-progress update whose resource-run
//!   row has not yet landed is returned to the caller in the result list
//!   rather than erroring the whole batch.
//!
//! # Thread Safety
//!
//! Implementations must be thread-safe (`Send + Sync`); the engine calls
//! through an `Arc<dyn ProgressPersistence>` shared across the context
//! pool's leased handles.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::ids::RunId;
use crate::resource_run::{ResourceRunComplete, ResourceRunCreate};
use crate::run::{Run, RunMetadata, RunStatus};
use crate::step_progress::{DeferredStepUpdate, StepProgressUpdate};

#[async_trait]
pub trait ProgressPersistence: Send + Sync {
    /// Creates the `pipeline_runs` row for a new run, assigning `run_id`
    /// if the metadata did not already carry one.
    async fn create_run(&self, request: RunMetadata) -> EngineResult<Run>;

    /// Writes the run's terminal status and recomputes its aggregate
    /// counts from the `resource_runs` table (§4.10).
    async fn complete_run(&self, run_id: RunId, final_status: RunStatus) -> EngineResult<Run>;

    /// Resource-ids that started but never reached a terminal status
    /// under `parent_run_id`, for a retry or continuation run to pick up.
    async fn get_incomplete_resource_ids(&self, parent_run_id: RunId) -> EngineResult<Vec<String>>;

    /// Inserts new `resource_runs` rows. Duplicates on `(run_id,
    /// resource_id)` are skipped rather than erroring.
    async fn create_resource_runs_batch(&self, run_id: RunId, updates: Vec<ResourceRunCreate>) -> EngineResult<()>;

    /// Appends `step_progress` rows, assigning `sequence` per
    /// resource-run at write time. Any update whose `resource_run_id` is
    /// not yet visible is returned in the result for next-flush retry.
    async fn update_step_progress_batch(
        &self,
        run_id: RunId,
        updates: Vec<StepProgressUpdate>,
    ) -> EngineResult<Vec<DeferredStepUpdate>>;

    /// Writes terminal status for a batch of resource-runs, then
    /// recomputes the owning run's aggregate counts from the
    /// `resource_runs` table the same way [`Self::complete_run`] does, so a
    /// mid-run read of the run's counts is never stale behind the last
    /// completion batch (§4.6).
    async fn complete_resource_runs_batch(&self, run_id: RunId, updates: Vec<ResourceRunComplete>) -> EngineResult<()>;
}
