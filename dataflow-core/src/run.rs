// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run
//!
//! Identity and aggregate state of one pipeline execution. A `Run` is
//! created when the pipeline starts and is the root every `ResourceRun`
//! references; its terminal status is written exactly once, by
//! `complete_run`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RunId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    Fresh,
    Retry,
    Continuation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled)
    }
}

/// Identity supplied by the caller when starting a pipeline, before a
/// `run_id` has necessarily been assigned. [`RunMetadata::run_id`] is
/// filled in by the factory (see `dataflow-engine::factories`) if absent.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub run_id: Option<RunId>,
    pub category: String,
    pub name: String,
    pub run_type: RunType,
    pub parent_run_id: Option<RunId>,
}

impl RunMetadata {
    pub fn fresh(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            run_id: None,
            category: category.into(),
            name: name.into(),
            run_type: RunType::Fresh,
            parent_run_id: None,
        }
    }

    pub fn retry_of(parent_run_id: RunId, category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            run_id: None,
            category: category.into(),
            name: name.into(),
            run_type: RunType::Retry,
            parent_run_id: Some(parent_run_id),
        }
    }

    /// Returns the assigned run id, minting one if this metadata predates
    /// assignment.
    pub fn run_id_or_assign(&mut self) -> RunId {
        *self.run_id.get_or_insert_with(RunId::new)
    }
}

/// Counts aggregated over every `ResourceRun` belonging to a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Durable record of one pipeline execution (§3 of the specification).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub category: String,
    pub name: String,
    pub run_type: RunType,
    pub parent_run_id: Option<RunId>,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub counts: RunCounts,
    /// Opaque, caller-defined configuration blob captured at run start.
    pub configuration: Option<serde_json::Value>,
}

impl Run {
    pub fn new(metadata: &RunMetadata, run_id: RunId, start_time: DateTime<Utc>) -> Self {
        Self {
            run_id,
            category: metadata.category.clone(),
            name: metadata.name.clone(),
            run_type: metadata.run_type,
            parent_run_id: metadata.parent_run_id,
            status: RunStatus::Pending,
            start_time,
            end_time: None,
            duration_ms: None,
            counts: RunCounts::default(),
            configuration: None,
        }
    }

    /// Marks the run terminal. Invariant: `end_time >= start_time`, and
    /// this may only be called once — callers must check
    /// `status.is_terminal()` first.
    pub fn complete(&mut self, status: RunStatus, end_time: DateTime<Utc>) {
        debug_assert!(status.is_terminal(), "complete() requires a terminal status");
        debug_assert!(
            end_time >= self.start_time,
            "end_time must not precede start_time"
        );
        self.status = status;
        self.end_time = Some(end_time);
        self.duration_ms = Some((end_time - self.start_time).num_milliseconds().max(0));
    }
}
