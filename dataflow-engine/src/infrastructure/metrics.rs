// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Prometheus Metrics (A4)
//!
//! A small fixed set of counters and a gauge, registered once against the
//! process-wide [`prometheus::Registry`] and updated from the progress
//! tracker's terminal-state transitions. Not wired into the stage workers
//! themselves — the tracker already aggregates per-run counts in
//! [`crate::progress::tracker::TrackerSnapshot`]; these metrics are a
//! cross-run view for a scrape endpoint.

use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

pub struct EngineMetrics {
    pub resources_total: IntCounterVec,
    pub resources_in_progress: IntGauge,
    pub deferred_updates_dropped: IntCounterVec,
}

impl EngineMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let resources_total = IntCounterVec::new(
            Opts::new("dataflow_resources_total", "Resources reaching a terminal state"),
            &["status"],
        )?;
        let resources_in_progress = IntGauge::new("dataflow_resources_in_progress", "Resources currently processing")?;
        let deferred_updates_dropped = IntCounterVec::new(
            Opts::new(
                "dataflow_deferred_updates_dropped_total",
                "Step-progress updates dropped after exceeding max deferred retries",
            ),
            &["run_id"],
        )?;

        registry.register(Box::new(resources_total.clone()))?;
        registry.register(Box::new(resources_in_progress.clone()))?;
        registry.register(Box::new(deferred_updates_dropped.clone()))?;

        Ok(Self {
            resources_total,
            resources_in_progress,
            deferred_updates_dropped,
        })
    }

    /// Updates the in-progress gauge to the tracker's current count. The
    /// terminal counters (`resources_total`) are incremented directly at
    /// the point of completion via [`Self::record_terminal`] instead, since
    /// `prometheus::Counter` is monotonic and a snapshot only has the
    /// running total, not the delta since the last scrape.
    pub fn observe_in_progress(&self, snapshot: &crate::progress::tracker::TrackerSnapshot) {
        self.resources_in_progress.set(snapshot.in_progress);
    }

    pub fn record_terminal(&self, status: dataflow_core::ResourceRunStatus) {
        let label = match status {
            dataflow_core::ResourceRunStatus::Completed => "completed",
            dataflow_core::ResourceRunStatus::Failed => "failed",
            dataflow_core::ResourceRunStatus::Cancelled => "cancelled",
            dataflow_core::ResourceRunStatus::Pending | dataflow_core::ResourceRunStatus::Processing => return,
        };
        self.resources_total.with_label_values(&[label]).inc();
    }

    pub fn record_dropped_update(&self, run_id: &str) {
        self.deferred_updates_dropped.with_label_values(&[run_id]).inc();
    }
}
