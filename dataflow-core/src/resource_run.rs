// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource Run
//!
//! One execution of the pipeline for one resource. `(run_id, resource_id)`
//! is unique; the resource-run cache (`dataflow-engine::resource_cache`) is
//! what enforces this in practice by minting at most one
//! [`ResourceRunId`] per pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ResourceRunId, RunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceRunStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ResourceRunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ResourceRunStatus::Completed | ResourceRunStatus::Failed | ResourceRunStatus::Cancelled
        )
    }
}

/// Durable record of one resource's journey through the pipeline (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRun {
    pub resource_run_id: ResourceRunId,
    pub run_id: RunId,
    pub resource_id: String,
    pub resource_type: String,
    pub status: ResourceRunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub processing_ms: Option<i64>,
    pub error_message: Option<String>,
    pub error_step: Option<String>,
    pub retry_count: u32,
}

impl ResourceRun {
    pub fn new(
        resource_run_id: ResourceRunId,
        run_id: RunId,
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_run_id,
            run_id,
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            status: ResourceRunStatus::Pending,
            start_time,
            end_time: None,
            processing_ms: None,
            error_message: None,
            error_step: None,
            retry_count: 0,
        }
    }

    pub fn complete(&mut self, status: ResourceRunStatus, end_time: DateTime<Utc>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.end_time = Some(end_time);
        self.processing_ms = Some((end_time - self.start_time).num_milliseconds().max(0));
    }

    pub fn fail(&mut self, end_time: DateTime<Utc>, error_message: impl Into<String>, error_step: impl Into<String>) {
        self.error_message = Some(error_message.into());
        self.error_step = Some(error_step.into());
        self.complete(ResourceRunStatus::Failed, end_time);
    }
}

/// One of the updates a progress tracker hands to persistence: either a
/// brand-new resource-run to insert, or a terminal update to an existing
/// one. Kept as two request shapes (rather than re-sending the whole
/// entity) to match the "bulk operations only" contract of §4.6.
#[derive(Debug, Clone)]
pub struct ResourceRunCreate {
    pub resource_run_id: ResourceRunId,
    pub resource_id: String,
    pub resource_type: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ResourceRunComplete {
    pub resource_run_id: ResourceRunId,
    pub status: ResourceRunStatus,
    pub end_time: DateTime<Utc>,
    pub error_message: Option<String>,
    pub error_step: Option<String>,
}
