// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Artifact
//!
//! One data blob emitted by a stage for a resource-run, e.g. an
//! intermediate document, an extracted fact set, or a debug dump. Artifacts
//! are append-only and `(resource_run_id, step_name, artifact_name)` is
//! unique — re-saving under the same key is a last-write-wins overwrite
//! (L1), not a duplicate insert.

use serde::{Deserialize, Serialize};

use crate::ids::{ArtifactId, ResourceRunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    ObjectStore,
    Relational,
    Filesystem,
    Memory,
}

/// Durable record of one artifact (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: ArtifactId,
    pub resource_run_id: ResourceRunId,
    pub step_name: String,
    pub artifact_name: String,
    pub storage_type: StorageType,
    pub storage_path: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
}

/// One request to save an artifact, as submitted by a `with-artifact`
/// stage to the artifact batcher (§4.8). `completion_token` is resolved by
/// the batcher after the storage adapter returns; most callers never poll
/// it, since artifact fan-off is fire-and-forget by default.
#[derive(Debug, Clone)]
pub struct ArtifactSaveRequest {
    pub resource_run_id: ResourceRunId,
    pub step_name: String,
    pub artifact_name: String,
    pub payload: serde_json::Value,
    pub storage_override: Option<StorageType>,
    pub metadata: Option<serde_json::Value>,
}

impl ArtifactSaveRequest {
    /// The object-store-style key `{run_id}/{step_name}/{artifact_name}`
    /// used both by the object-store adapter and, for uniqueness, by
    /// every other adapter (§6 "Object-store layout").
    pub fn storage_key(&self, run_id: impl std::fmt::Display) -> String {
        format!("{}/{}/{}", run_id, self.step_name, self.artifact_name)
    }
}

/// Outcome of one artifact save, as returned by the storage adapter (§4.9).
#[derive(Debug, Clone)]
pub struct ArtifactSaveOutcome {
    pub success: bool,
    pub storage_path: Option<String>,
    pub error_message: Option<String>,
}

impl ArtifactSaveOutcome {
    pub fn ok(storage_path: impl Into<String>) -> Self {
        Self {
            success: true,
            storage_path: Some(storage_path.into()),
            error_message: None,
        }
    }

    pub fn err(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            storage_path: None,
            error_message: Some(error_message.into()),
        }
    }
}
