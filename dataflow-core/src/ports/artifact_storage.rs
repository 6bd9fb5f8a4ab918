// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Artifact Storage Port
//!
//! The bulk-save contract an artifact storage backend must satisfy
//! (§4.9). An implementation is free to choose any serialization for the
//! payload; the only hard requirement is that two requests with an
//! identical key (`{run_id}/{step_name}/{artifact_name}`) overwrite each
//! other rather than accumulate (L1).

use async_trait::async_trait;

use crate::artifact::{ArtifactSaveOutcome, ArtifactSaveRequest};
use crate::ids::RunId;

#[async_trait]
pub trait ArtifactStorageAdapter: Send + Sync {
    /// Saves a batch of artifacts, returning one outcome per request in
    /// the same order. A per-request failure is recorded in its outcome,
    /// not returned as an `Err` for the whole batch — artifact storage
    /// failures never fail the pipeline (§7, category 6).
    async fn save_batch(&self, run_id: RunId, requests: &[ArtifactSaveRequest]) -> Vec<ArtifactSaveOutcome>;
}
