// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Filesystem-backed artifact storage (§4.9A): one JSON file per artifact
//! under `{root}/{run_id}/{step_name}/{artifact_name}.json`.

use std::path::PathBuf;

use async_trait::async_trait;
use dataflow_core::{ArtifactSaveOutcome, ArtifactSaveRequest, ArtifactStorageAdapter, RunId};
use tokio::fs;

pub struct FilesystemArtifactStorage {
    root: PathBuf,
}

impl FilesystemArtifactStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, run_id: RunId, request: &ArtifactSaveRequest) -> PathBuf {
        self.root
            .join(run_id.to_string())
            .join(&request.step_name)
            .join(format!("{}.json", request.artifact_name))
    }

    async fn save_one(&self, run_id: RunId, request: &ArtifactSaveRequest) -> Result<String, String> {
        let path = self.path_for(run_id, request);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| e.to_string())?;
        }
        let body = serde_json::to_vec_pretty(&request.payload).map_err(|e| e.to_string())?;
        fs::write(&path, body).await.map_err(|e| e.to_string())?;
        Ok(path.display().to_string())
    }
}

#[async_trait]
impl ArtifactStorageAdapter for FilesystemArtifactStorage {
    async fn save_batch(&self, run_id: RunId, requests: &[ArtifactSaveRequest]) -> Vec<ArtifactSaveOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(match self.save_one(run_id, request).await {
                Ok(path) => ArtifactSaveOutcome::ok(path),
                Err(err) => ArtifactSaveOutcome::err(err),
            });
        }
        outcomes
    }
}
