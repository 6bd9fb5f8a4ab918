// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dataflow Engine
//!
//! The concurrency layer built on top of `dataflow-core`'s domain types:
//! a fluent stage-graph builder ([`builder::PipelineBuilder`]), an
//! in-memory progress tracker, a resource-run identity cache, an artifact
//! batcher, reference persistence and storage adapters, and the factory
//! that wires a fresh [`context::Context`] together per run.
//!
//! A typical caller only touches three things directly:
//! [`factories::EngineFactory`] to start a run, [`builder::PipelineBuilder`]
//! to describe the stage graph, and the [`context::RunOutcome`] that
//! `execute()` returns.

pub mod artifact;
pub mod builder;
pub mod context;
pub mod context_pool;
pub mod factories;
pub mod infrastructure;
pub mod persistence;
pub mod progress;
pub mod resource_cache;
pub mod stage;

pub use builder::{ArtifactSpec, PipelineBuilder, StageBuilder};
pub use context::{Context, RunOutcome};
pub use context_pool::{ContextLease, ContextPool};
pub use factories::{EngineFactory, EngineHandle};
pub use infrastructure::{init_logging, run_span, EngineConfig, EngineMetrics};
pub use progress::{ProgressTracker, ResourceSnapshot, StepMetric, TrackerSnapshot};
pub use resource_cache::{DuplicatePolicy, ResourceRunCache};
pub use stage::{Capacity, StageConfig};
