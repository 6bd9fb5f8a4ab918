// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Progress Persistence
//!
//! The reference [`ProgressPersistence`] implementation (§4.6, A5). Three
//! tables hold the durable state: `pipeline_runs`, `resource_runs`, and
//! `step_progress`; a fourth, `artifacts`, is shared with
//! `dataflow-engine::artifact::storage::sqlite` since both need the same
//! pool.
//!
//! Every write is a single `sqlx` transaction per batch, matching "bulk
//! operations only" (§4.6 Design Principles): a create-resource-runs call
//! with 500 rows issues one `INSERT ... ON CONFLICT DO NOTHING` statement
//! per row inside one transaction, not 500 round trips.

use async_trait::async_trait;
use chrono::Utc;
use dataflow_core::{DeferredStepUpdate, EngineError, EngineResult, Run, RunId, RunMetadata, RunStatus};
use dataflow_core::{ProgressPersistence, ResourceRunComplete, ResourceRunCreate, StepProgressUpdate};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Renders a `#[serde(rename_all = "snake_case")]` enum the same way it
/// would serialize, so text stored here matches the literals used in hand
/// written `WHERE status IN (...)` clauses.
pub(crate) fn snake_case<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => unreachable!("enum variants serialize to strings"),
    }
}

pub struct SqlitePersistence {
    pool: SqlitePool,
}

impl SqlitePersistence {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the schema this adapter expects, if it is not already
    /// present. Tests and the bootstrap demo call this against a fresh
    /// in-memory database; a real deployment runs migrations separately.
    pub async fn migrate(&self) -> EngineResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pipeline_runs (
                run_id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                name TEXT NOT NULL,
                run_type TEXT NOT NULL,
                parent_run_id TEXT,
                status TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_ms INTEGER,
                total_count INTEGER NOT NULL DEFAULT 0,
                completed_count INTEGER NOT NULL DEFAULT 0,
                failed_count INTEGER NOT NULL DEFAULT 0,
                skipped_count INTEGER NOT NULL DEFAULT 0,
                configuration TEXT
            );
            CREATE TABLE IF NOT EXISTS resource_runs (
                resource_run_id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL,
                resource_id TEXT NOT NULL,
                resource_type TEXT NOT NULL,
                status TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                processing_ms INTEGER,
                error_message TEXT,
                error_step TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                UNIQUE(run_id, resource_id)
            );
            CREATE TABLE IF NOT EXISTS step_progress (
                step_progress_id TEXT PRIMARY KEY,
                resource_run_id TEXT NOT NULL,
                step_name TEXT NOT NULL,
                status TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_ms INTEGER,
                error_message TEXT
            );
            CREATE TABLE IF NOT EXISTS artifacts (
                artifact_id TEXT PRIMARY KEY,
                resource_run_id TEXT NOT NULL,
                step_name TEXT NOT NULL,
                artifact_name TEXT NOT NULL,
                storage_type TEXT NOT NULL,
                storage_path TEXT,
                payload TEXT,
                metadata TEXT,
                UNIQUE(resource_run_id, step_name, artifact_name)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Persistence(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ProgressPersistence for SqlitePersistence {
    async fn create_run(&self, mut request: RunMetadata) -> EngineResult<Run> {
        let run_id = request.run_id_or_assign();
        let start_time = Utc::now();
        let run = Run::new(&request, run_id, start_time);
        sqlx::query(
            "INSERT INTO pipeline_runs (run_id, category, name, run_type, parent_run_id, status, start_time) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run.run_id.to_string())
        .bind(&run.category)
        .bind(&run.name)
        .bind(snake_case(&run.run_type))
        .bind(run.parent_run_id.map(|p| p.to_string()))
        .bind(snake_case(&run.status))
        .bind(run.start_time.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Persistence(e.to_string()))?;
        Ok(run)
    }

    async fn complete_run(&self, run_id: RunId, final_status: RunStatus) -> EngineResult<Run> {
        let counts = sqlx::query(
            "SELECT \
               COUNT(*) AS total, \
               SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END) AS completed, \
               SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) AS failed \
             FROM resource_runs WHERE run_id = ?",
        )
        .bind(run_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EngineError::Persistence(e.to_string()))?;

        let total: i64 = counts.try_get("total").unwrap_or(0);
        let completed: i64 = counts.try_get("completed").unwrap_or(0);
        let failed: i64 = counts.try_get("failed").unwrap_or(0);
        let end_time = Utc::now();

        sqlx::query(
            "UPDATE pipeline_runs SET status = ?, end_time = ?, total_count = ?, completed_count = ?, failed_count = ? \
             WHERE run_id = ?",
        )
        .bind(snake_case(&final_status))
        .bind(end_time.to_rfc3339())
        .bind(total)
        .bind(completed)
        .bind(failed)
        .bind(run_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Persistence(e.to_string()))?;

        let row = sqlx::query("SELECT start_time, category, name, run_type, parent_run_id FROM pipeline_runs WHERE run_id = ?")
            .bind(run_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
        let start_time: String = row.try_get("start_time").map_err(|e| EngineError::Persistence(e.to_string()))?;
        let start_time = chrono::DateTime::parse_from_rfc3339(&start_time)
            .map_err(|e| EngineError::Persistence(e.to_string()))?
            .with_timezone(&Utc);

        let metadata = RunMetadata {
            run_id: Some(run_id),
            category: row.try_get("category").unwrap_or_default(),
            name: row.try_get("name").unwrap_or_default(),
            run_type: dataflow_core::RunType::Fresh,
            parent_run_id: None,
        };
        let mut run = Run::new(&metadata, run_id, start_time);
        run.complete(final_status, end_time);
        run.counts.total = total.max(0) as u64;
        run.counts.completed = completed.max(0) as u64;
        run.counts.failed = failed.max(0) as u64;
        Ok(run)
    }

    async fn get_incomplete_resource_ids(&self, parent_run_id: RunId) -> EngineResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT resource_id FROM resource_runs WHERE run_id = ? AND status NOT IN ('completed', 'failed', 'cancelled')",
        )
        .bind(parent_run_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::Persistence(e.to_string()))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.try_get::<String, _>("resource_id").ok())
            .collect())
    }

    async fn create_resource_runs_batch(&self, run_id: RunId, updates: Vec<ResourceRunCreate>) -> EngineResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(|e| EngineError::Persistence(e.to_string()))?;
        for update in updates {
            sqlx::query(
                "INSERT INTO resource_runs (resource_run_id, run_id, resource_id, resource_type, status, start_time) \
                 VALUES (?, ?, ?, ?, 'processing', ?) \
                 ON CONFLICT(run_id, resource_id) DO NOTHING",
            )
            .bind(update.resource_run_id.to_string())
            .bind(run_id.to_string())
            .bind(&update.resource_id)
            .bind(&update.resource_type)
            .bind(update.start_time.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| EngineError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn update_step_progress_batch(
        &self,
        _run_id: RunId,
        updates: Vec<StepProgressUpdate>,
    ) -> EngineResult<Vec<DeferredStepUpdate>> {
        let mut deferred = Vec::new();
        let mut tx = self.pool.begin().await.map_err(|e| EngineError::Persistence(e.to_string()))?;
        for update in updates {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM resource_runs WHERE resource_run_id = ?")
                .bind(update.resource_run_id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| EngineError::Persistence(e.to_string()))?;
            if exists.is_none() {
                deferred.push(DeferredStepUpdate { update, retry_count: 0 });
                continue;
            }
            let sequence: i64 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(sequence), -1) + 1 FROM step_progress WHERE resource_run_id = ?",
            )
            .bind(update.resource_run_id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

            sqlx::query(
                "INSERT INTO step_progress (step_progress_id, resource_run_id, step_name, status, sequence, start_time, end_time, duration_ms, error_message) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(update.step_progress_id.to_string())
            .bind(update.resource_run_id.to_string())
            .bind(&update.step_name)
            .bind(snake_case(&update.status))
            .bind(sequence)
            .bind(update.start_time.to_rfc3339())
            .bind(update.end_time.map(|t| t.to_rfc3339()))
            .bind(update.duration_ms)
            .bind(&update.error_message)
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| EngineError::Persistence(e.to_string()))?;
        Ok(deferred)
    }

    async fn complete_resource_runs_batch(&self, run_id: RunId, updates: Vec<ResourceRunComplete>) -> EngineResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(|e| EngineError::Persistence(e.to_string()))?;
        for update in updates {
            let start_time: String = sqlx::query_scalar("SELECT start_time FROM resource_runs WHERE resource_run_id = ?")
                .bind(update.resource_run_id.to_string())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| EngineError::Persistence(e.to_string()))?;
            let start_time = chrono::DateTime::parse_from_rfc3339(&start_time)
                .map_err(|e| EngineError::Persistence(e.to_string()))?
                .with_timezone(&Utc);
            let processing_ms = (update.end_time - start_time).num_milliseconds().max(0);

            sqlx::query(
                "UPDATE resource_runs SET status = ?, end_time = ?, processing_ms = ?, error_message = ?, error_step = ? \
                 WHERE resource_run_id = ?",
            )
            .bind(snake_case(&update.status))
            .bind(update.end_time.to_rfc3339())
            .bind(processing_ms)
            .bind(&update.error_message)
            .bind(&update.error_step)
            .bind(update.resource_run_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;
        }

        // Recompute the owning run's aggregate counts in the same
        // transaction, the same way complete_run does, so a mid-run read
        // of pipeline_runs is never stale behind this completion batch.
        let counts = sqlx::query(
            "SELECT \
               COUNT(*) AS total, \
               SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END) AS completed, \
               SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) AS failed \
             FROM resource_runs WHERE run_id = ?",
        )
        .bind(run_id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| EngineError::Persistence(e.to_string()))?;

        let total: i64 = counts.try_get("total").unwrap_or(0);
        let completed: i64 = counts.try_get("completed").unwrap_or(0);
        let failed: i64 = counts.try_get("failed").unwrap_or(0);

        sqlx::query("UPDATE pipeline_runs SET total_count = ?, completed_count = ?, failed_count = ? WHERE run_id = ?")
            .bind(total)
            .bind(completed)
            .bind(failed)
            .bind(run_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| EngineError::Persistence(e.to_string()))?;

        tx.commit().await.map_err(|e| EngineError::Persistence(e.to_string()))?;
        Ok(())
    }
}
