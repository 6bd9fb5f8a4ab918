// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Relational artifact storage (§4.9A): writes into the `artifacts` table
//! of the same `sqlx::SqlitePool` the reference [`SqlitePersistence`]
//! adapter uses, via `serde_json` text columns.
//!
//! [`SqlitePersistence`]: crate::persistence::sqlite_store::SqlitePersistence

use async_trait::async_trait;
use dataflow_core::{ArtifactId, ArtifactSaveOutcome, ArtifactSaveRequest, ArtifactStorageAdapter, RunId, StorageType};
use sqlx::SqlitePool;

use crate::persistence::sqlite_store::snake_case;

pub struct SqliteArtifactStorage {
    pool: SqlitePool,
}

impl SqliteArtifactStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn save_one(&self, run_id: RunId, request: &ArtifactSaveRequest) -> Result<String, String> {
        let artifact_id = ArtifactId::new();
        let key = request.storage_key(run_id);
        let metadata_text = request
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| e.to_string())?;
        let payload_text = serde_json::to_string(&request.payload).map_err(|e| e.to_string())?;
        let storage_type = snake_case(&StorageType::Relational);

        sqlx::query(
            "INSERT INTO artifacts (artifact_id, resource_run_id, step_name, artifact_name, storage_type, storage_path, payload, metadata) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(resource_run_id, step_name, artifact_name) DO UPDATE SET payload = excluded.payload, metadata = excluded.metadata",
        )
        .bind(artifact_id.to_string())
        .bind(request.resource_run_id.to_string())
        .bind(&request.step_name)
        .bind(&request.artifact_name)
        .bind(storage_type)
        .bind(&key)
        .bind(payload_text)
        .bind(metadata_text)
        .execute(&self.pool)
        .await
        .map_err(|e| e.to_string())?;

        Ok(key)
    }
}

#[async_trait]
impl ArtifactStorageAdapter for SqliteArtifactStorage {
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
