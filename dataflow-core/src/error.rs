// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Error Taxonomy
//!
//! A single error type crosses every seam in the dataflow engine: stage
//! execution, stage-graph construction, progress persistence, and artifact
//! storage. Infrastructure-level errors (`sqlx::Error`, `std::io::Error`) are
//! wrapped at the adapter boundary and never leak past a port trait.
//!
//! ## Categories
//!
//! - Construction errors (`InvalidConfiguration`, `DuplicateStepName`) are
//!   raised synchronously while a pipeline is being built, before any
//!   resource is processed.
//! - `StageFailure` is how a user function's error becomes a `Failure`
//!   envelope (see [`crate::envelope::Envelope`]); it never aborts the
//!   pipeline.
//! - `Persistence` and `ArtifactStorage` wrap store-specific failures;
//!   callers retry or log rather than propagate them into the dataflow.
//! - `Cancelled` is observed, not thrown: stages check a cancellation
//!   signal cooperatively rather than receiving this variant as a `Result`.

use thiserror::Error;

/// The error type shared by every public operation in the dataflow engine.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    /// A stage, artifact, or context-pool configuration value failed
    /// validation at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Two stages in the same graph were given the same `step-name`.
    #[error("duplicate step name: {0}")]
    DuplicateStepName(String),

    /// Two transform-many siblings produced the same child resource-id
    /// within the same run, and the resource-run cache's duplicate policy
    /// is `Reject`.
    #[error("duplicate child resource id '{resource_id}' in run {run_id}")]
    DuplicateChildResourceId { run_id: String, resource_id: String },

    /// A user function raised inside a stage. Carried as the `Failure`
    /// variant of the result envelope; this variant exists so the same
    /// type can also represent it when surfaced through `into_result`.
    #[error("stage '{step}' failed: {source_message}")]
    StageFailure { step: String, source_message: String },

    /// The progress persistence service could not complete a batch write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The artifact storage adapter could not complete a save.
    #[error("artifact storage error: {0}")]
    ArtifactStorage(String),

    /// The run's cancellation signal fired. Propagated only out of
    /// `execute()`'s final status computation, never out of an individual
    /// stage.
    #[error("run was cancelled")]
    Cancelled,
}

impl EngineError {
    /// Wraps an arbitrary user-function error as a stage failure.
    pub fn stage_failure(step: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Self::StageFailure {
            step: step.into(),
            source_message: source.to_string(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
