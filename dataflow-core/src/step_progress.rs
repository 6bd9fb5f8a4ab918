// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Progress
//!
//! One row per stage execution for one resource-run. Rows are append-only:
//! a step is inserted `in-progress` at start and a second, terminal row is
//! inserted at completion — never an update in place. `sequence` is
//! assigned by the persistence layer at write time (§4.6, §9), not by the
//! tracker, so it stays gap-free under concurrent writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ResourceRunId, StepProgressId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

/// Durable record of one stage execution for one resource-run (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepProgress {
    pub step_progress_id: StepProgressId,
    pub resource_run_id: ResourceRunId,
    pub step_name: String,
    pub status: StepStatus,
    pub sequence: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
}

/// A step-progress write as submitted by the tracker, before a `sequence`
/// has been assigned. Persistence assigns `sequence` under the
/// resource-run's row lock at write time.
#[derive(Debug, Clone)]
pub struct StepProgressUpdate {
    pub step_progress_id: StepProgressId,
    pub resource_run_id: ResourceRunId,
    pub step_name: String,
    pub status: StepStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
}

impl StepProgressUpdate {
    pub fn started(resource_run_id: ResourceRunId, step_name: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            step_progress_id: StepProgressId::new(),
            resource_run_id,
            step_name: step_name.into(),
            status: StepStatus::InProgress,
            start_time,
            end_time: None,
            duration_ms: None,
            error_message: None,
        }
    }

    pub fn completed(
        resource_run_id: ResourceRunId,
        step_name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            step_progress_id: StepProgressId::new(),
            resource_run_id,
            step_name: step_name.into(),
            status: StepStatus::Completed,
            start_time,
            end_time: Some(end_time),
            duration_ms: Some((end_time - start_time).num_milliseconds().max(0)),
            error_message: None,
        }
    }

    pub fn failed(
        resource_run_id: ResourceRunId,
        step_name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        error_message: Option<String>,
    ) -> Self {
        Self {
            step_progress_id: StepProgressId::new(),
            resource_run_id,
            step_name: step_name.into(),
            status: StepStatus::Failed,
            start_time,
            end_time: Some(end_time),
            duration_ms: Some((end_time - start_time).num_milliseconds().max(0)),
            error_message,
        }
    }
}

/// A step-progress update that could not be written because its
/// `resource_run_id` has not yet been persisted (§4.6 "deferred" case).
/// Returned to the caller for retry on the next flush tick.
#[derive(Debug, Clone)]
pub struct DeferredStepUpdate {
    pub update: StepProgressUpdate,
    pub retry_count: u32,
}
