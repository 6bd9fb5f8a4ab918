// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Structured Logging (A2)
//!
//! Installs a `tracing-subscriber` `fmt` layer honoring `RUST_LOG`
//! (`EnvFilter`), defaulting to `info` when unset. Stage workers log
//! through `#[tracing::instrument]`-style spans rooted at the run's own
//! [`tracing::Span`] (`Context::run_span`), so every log line from a
//! worker processing run `R` carries `run_id=R` without callers having to
//! pass it explicitly.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Installs the global subscriber. Call once, at process start; a second
/// call is a harmless no-op (the underlying `set_global_default` error is
/// swallowed, matching how every long-running service in this codebase
/// tolerates being initialized twice under test harnesses).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(tracing_subscriber::fmt::layer());
    let _ = subscriber.try_init();
}

/// Builds the root span a run's [`crate::context::Context`] carries
/// (`Context::run_span`), so every stage worker's log lines are tagged
/// with the run they belong to.
pub fn run_span(run_id: dataflow_core::RunId, category: &str, name: &str) -> tracing::Span {
    tracing::info_span!("pipeline_run", run_id = %run_id, category = %category, name = %name)
}
