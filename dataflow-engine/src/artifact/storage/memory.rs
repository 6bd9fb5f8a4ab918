// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! In-memory artifact storage (§4.9A): a `DashMap` keyed by the standard
//! object-store key. Intended for tests and the bootstrap demo, not
//! production use — artifacts vanish with the process.

use async_trait::async_trait;
use dashmap::DashMap;
use dataflow_core::{ArtifactSaveOutcome, ArtifactSaveRequest, ArtifactStorageAdapter, RunId};

#[derive(Default)]
pub struct InMemoryArtifactStorage {
    entries: DashMap<String, serde_json::Value>,
}

impl InMemoryArtifactStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.get(key).map(|v| v.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ArtifactStorageAdapter for InMemoryArtifactStorage {
    async fn save_batch(&self, run_id: RunId, requests: &[ArtifactSaveRequest]) -> Vec<ArtifactSaveOutcome> {
        requests
            .iter()
            .map(|request| {
                let key = request.storage_key(run_id);
                self.entries.insert(key.clone(), request.payload.clone());
                ArtifactSaveOutcome::ok(key)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataflow_core::ResourceRunId;

    #[tokio::test]
    async fn save_batch_overwrites_same_key() {
        let storage = InMemoryArtifactStorage::new();
        let run_id = RunId::new();
        let request = ArtifactSaveRequest {
            resource_run_id: ResourceRunId::new(),
            step_name: "extract".to_string(),
            artifact_name: "facts".to_string(),
            payload: serde_json::json!({"v": 1}),
            storage_override: None,
            metadata: None,
        };
        storage.save_batch(run_id, &[request.clone()]).await;
        let mut second = request;
        second.payload = serde_json::json!({"v": 2});
        storage.save_batch(run_id, &[second]).await;
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get(&format!("{run_id}/extract/facts")), Some(serde_json::json!({"v": 2})));
    }
}
