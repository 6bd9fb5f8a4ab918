// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Progress Tracker
//!
//! The single in-memory source of truth for "what is happening right now"
//! (§4.5). Every stage worker calls into it on the hot path, so each
//! operation takes only the lock for the one resource it touches —
//! `DashMap` shards the top-level map and a `parking_lot::RwLock` guards
//! each resource's own state, so two workers updating two different
//! resources never contend.
//!
//! A resource exploded by a transform-many fan-out (§4.3, transform-many)
//! does not report itself complete independently of its children: the
//! parent's `ResourceState` carries a `pending_children` counter seeded by
//! [`ProgressTracker::begin_fan_out`], and the last child to finish rolls
//! the parent's own terminal status up automatically (failed if any child
//! failed, completed otherwise). This is how the engine satisfies "parent
//! resource p1 completes exactly once" for scenario 2 without the
//! transform-many stage itself having to wait around for its fan-out to
//! drain.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dataflow_core::{
    DeferredStepUpdate, EngineResult, ResourcePath, ResourceRunComplete, ResourceRunCreate, ResourceRunId,
    ResourceRunStatus, RunId, StepProgressUpdate, StepStatus,
};
use parking_lot::RwLock;
use tracing::warn;

use crate::context_pool::ContextPool;
use crate::resource_cache::ResourceRunCache;
use dataflow_core::ProgressPersistence;

#[derive(Debug, Clone)]
pub struct StepMetric {
    pub step_name: String,
    pub status: StepStatus,
    pub duration_ms: Option<i64>,
}

struct ResourceState {
    resource_run_id: ResourceRunId,
    resource_type: String,
    status: ResourceRunStatus,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    steps: Vec<StepMetric>,
    pending_children: usize,
    children_failed: bool,
    first_child_error: Option<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    pub path: String,
    pub resource_type: String,
    pub status: ResourceRunStatus,
    pub steps: Vec<StepMetric>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackerSnapshot {
    pub total: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
    pub resources: Vec<ResourceSnapshot>,
}

pub struct ProgressTracker {
    run_id: RunId,
    cache: std::sync::Arc<ResourceRunCache>,
    resources: DashMap<String, RwLock<ResourceState>>,
    total: AtomicI64,
    in_progress: AtomicI64,
    completed: AtomicI64,
    failed: AtomicI64,
    cancelled: AtomicI64,
    pending_creates: RwLock<Vec<ResourceRunCreate>>,
    pending_step_updates: RwLock<Vec<StepProgressUpdate>>,
    pending_completes: RwLock<Vec<ResourceRunComplete>>,
    max_deferred_retries: u32,
    retry_count: AtomicUsize,
}

impl ProgressTracker {
    pub fn new(run_id: RunId, cache: std::sync::Arc<ResourceRunCache>, max_deferred_retries: u32) -> Self {
        Self {
            run_id,
            cache,
            resources: DashMap::new(),
            total: AtomicI64::new(0),
            in_progress: AtomicI64::new(0),
            completed: AtomicI64::new(0),
            failed: AtomicI64::new(0),
            cancelled: AtomicI64::new(0),
            pending_creates: RwLock::new(Vec::new()),
            pending_step_updates: RwLock::new(Vec::new()),
            pending_completes: RwLock::new(Vec::new()),
            max_deferred_retries,
            retry_count: AtomicUsize::new(0),
        }
    }

    /// Registers a resource newly observed at the source (or a
    /// transform-many child, via [`Self::begin_fan_out`]). Errors if the
    /// resource-run cache's duplicate policy rejects this path's leaf id.
    pub fn record_resource_start(&self, path: &ResourcePath, resource_type: &str, now: DateTime<Utc>) -> EngineResult<()> {
        let resource_run_id = self.cache.get_or_create(self.run_id, path.leaf_id())?;
        self.resources.insert(
            path.to_string(),
            RwLock::new(ResourceState {
                resource_run_id,
                resource_type: resource_type.to_string(),
                status: ResourceRunStatus::Processing,
                start: now,
                end: None,
                steps: Vec::new(),
                pending_children: 0,
                children_failed: false,
                first_child_error: None,
            }),
        );
        self.pending_creates.write().push(ResourceRunCreate {
            resource_run_id,
            resource_id: path.leaf_id().to_string(),
            resource_type: resource_type.to_string(),
            start_time: now,
        });
        self.total.fetch_add(1, Ordering::Relaxed);
        self.in_progress.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Marks `parent_path` as fanned out into `child_count` children. If
    /// `child_count` is zero the parent is immediately completed, since a
    /// transform-many that produced nothing failed nothing either.
    pub fn begin_fan_out(&self, parent_path: &ResourcePath, child_count: usize, now: DateTime<Utc>) {
        if child_count == 0 {
            self.record_resource_complete(parent_path, ResourceRunStatus::Completed, None, None, now);
            return;
        }
        if let Some(state) = self.resources.get(&parent_path.to_string()) {
            let mut state = state.write();
            state.pending_children = child_count;
        }
    }

    pub fn record_step_start(&self, path: &ResourcePath, step_name: &str, now: DateTime<Utc>) {
        let Some(state) = self.resources.get(&path.to_string()) else {
            warn!(path = %path, "record_step_start for untracked resource path");
            return;
        };
        let resource_run_id = {
            let mut state = state.write();
            state.steps.push(StepMetric {
                step_name: step_name.to_string(),
                status: StepStatus::InProgress,
                duration_ms: None,
            });
            state.resource_run_id
        };
        self.pending_step_updates
            .write()
            .push(StepProgressUpdate::started(resource_run_id, step_name, now));
    }

    fn finish_step(
        &self,
        path: &ResourcePath,
        step_name: &str,
        status: StepStatus,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
        error: Option<String>,
    ) {
        let Some(state) = self.resources.get(&path.to_string()) else {
            warn!(path = %path, "finish_step for untracked resource path");
            return;
        };
        let duration_ms = (now - start).num_milliseconds().max(0);
        let resource_run_id = {
            let mut state = state.write();
            if let Some(metric) = state.steps.iter_mut().rev().find(|m| m.step_name == step_name && m.status == StepStatus::InProgress) {
                metric.status = status;
                metric.duration_ms = Some(duration_ms);
            }
            state.resource_run_id
        };
        let update = match status {
            StepStatus::Completed => StepProgressUpdate::completed(resource_run_id, step_name, start, now),
            StepStatus::Failed => StepProgressUpdate::failed(resource_run_id, step_name, start, now, error),
            _ => return,
        };
        self.pending_step_updates.write().push(update);
    }

    pub fn record_step_complete(&self, path: &ResourcePath, step_name: &str, start: DateTime<Utc>, now: DateTime<Utc>) {
        self.finish_step(path, step_name, StepStatus::Completed, start, now, None);
    }

    pub fn record_step_failed(
        &self,
        path: &ResourcePath,
        step_name: &str,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
        error: Option<String>,
    ) {
        self.finish_step(path, step_name, StepStatus::Failed, start, now, error);
    }

    /// Marks a resource terminal. If `path` has a parent (§3,
    /// `ResourcePath::depth() > 1`), decrements the parent's pending-child
    /// counter and, once it reaches zero, recursively completes the parent
    /// with the rolled-up status.
    pub fn record_resource_complete(
        &self,
        path: &ResourcePath,
        status: ResourceRunStatus,
        error: Option<String>,
        error_step: Option<String>,
        now: DateTime<Utc>,
    ) {
        let Some(state_lock) = self.resources.get(&path.to_string()) else {
            warn!(path = %path, "record_resource_complete for untracked resource path");
            return;
        };
        let resource_run_id = {
            let mut state = state_lock.write();
            if state.status.is_terminal() {
                return;
            }
            state.status = status;
            state.end = Some(now);
            state.resource_run_id
        };
        drop(state_lock);

        self.pending_completes.write().push(ResourceRunComplete {
            resource_run_id,
            status,
            end_time: now,
            error_message: error.clone(),
            error_step: error_step.clone(),
        });
        self.in_progress.fetch_sub(1, Ordering::Relaxed);
        match status {
            ResourceRunStatus::Completed => {
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            ResourceRunStatus::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            ResourceRunStatus::Cancelled => {
                self.cancelled.fetch_add(1, Ordering::Relaxed);
            }
            ResourceRunStatus::Pending | ResourceRunStatus::Processing => {}
        }

        if path.depth() <= 1 {
            return;
        }
        let parent_segments = &path.segments()[..path.segments().len() - 1];
        let parent_path = ResourcePath::from_segments(parent_segments.to_vec()).expect("parent of a child path is non-empty");
        let Some(parent_lock) = self.resources.get(&parent_path.to_string()) else {
            return;
        };
        let rollup = {
            let mut parent = parent_lock.write();
            if status == ResourceRunStatus::Failed && parent.first_child_error.is_none() {
                parent.children_failed = true;
                parent.first_child_error = error.clone().zip(error_step.clone());
            }
            parent.pending_children = parent.pending_children.saturating_sub(1);
            if parent.pending_children == 0 {
                let final_status = if parent.children_failed {
                    ResourceRunStatus::Failed
                } else {
                    ResourceRunStatus::Completed
                };
                let (err_msg, err_step) = parent.first_child_error.clone().unzip();
                Some((final_status, err_msg, err_step))
            } else {
                None
            }
        };
        drop(parent_lock);
        if let Some((final_status, err_msg, err_step)) = rollup {
            self.record_resource_complete(&parent_path, final_status, err_msg, err_step, now);
        }
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let resources = self
            .resources
            .iter()
            .map(|entry| {
                let state = entry.value().read();
                ResourceSnapshot {
                    path: entry.key().clone(),
                    resource_type: state.resource_type.clone(),
                    status: state.status,
                    steps: state.steps.clone(),
                }
            })
            .collect();
        TrackerSnapshot {
            total: self.total.load(Ordering::Relaxed),
            in_progress: self.in_progress.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            resources,
        }
    }

    /// Drains every pending queue into `persistence`, bounded by a context
    /// pool lease. Deferred step updates (resource-run not yet visible)
    /// are retried up to `max_deferred_retries` times before being
    /// dropped with a `warn!` (§9 Open Question resolution).
    pub async fn flush(&self, pool: &ContextPool, persistence: &dyn ProgressPersistence) -> EngineResult<()> {
        let creates: Vec<_> = std::mem::take(&mut *self.pending_creates.write());
        if !creates.is_empty() {
            let _lease = pool.acquire().await?;
            persistence.create_resource_runs_batch(self.run_id, creates).await?;
        }

        let updates: Vec<_> = std::mem::take(&mut *self.pending_step_updates.write());
        if !updates.is_empty() {
            let _lease = pool.acquire().await?;
            let deferred = persistence.update_step_progress_batch(self.run_id, updates).await?;
            self.requeue_deferred(deferred);
        }

        let completes: Vec<_> = std::mem::take(&mut *self.pending_completes.write());
        if !completes.is_empty() {
            let _lease = pool.acquire().await?;
            persistence.complete_resource_runs_batch(self.run_id, completes).await?;
        }
        Ok(())
    }

    fn requeue_deferred(&self, deferred: Vec<DeferredStepUpdate>) {
        let mut retry_queue = self.pending_step_updates.write();
        for item in deferred {
            if item.retry_count >= self.max_deferred_retries {
                warn!(
                    step = %item.update.step_name,
                    retries = item.retry_count,
                    "dropping step-progress update after exceeding max deferred retries"
                );
                self.retry_count.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            retry_queue.push(item.update);
        }
    }

    /// Final flush at the end of a run: flushes until both pending queues
    /// are empty or a bounded number of extra passes elapses (deferred
    /// step updates needing a resource-run commit from the same flush).
    pub async fn finalize(&self, pool: &ContextPool, persistence: &dyn ProgressPersistence) -> EngineResult<()> {
        for _ in 0..(self.max_deferred_retries as usize + 2) {
            self.flush(pool, persistence).await?;
            if self.pending_creates.read().is_empty()
                && self.pending_step_updates.read().is_empty()
                && self.pending_completes.read().is_empty()
            {
                break;
            }
        }
        Ok(())
    }

    pub fn dropped_update_count(&self) -> usize {
        self.retry_count.load(Ordering::Relaxed)
    }
}
