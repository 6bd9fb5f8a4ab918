// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration (A3)
//!
//! Layered configuration via the `config` crate: defaults, an optional
//! `pipeline.toml`, then environment variables prefixed `DATAFLOW_`
//! (`DATAFLOW_CONTEXT_POOL__SIZE=8`, following `config`'s double-underscore
//! nesting convention). Every section maps directly onto a supplement
//! named in the specification's §6 "Configuration surface".

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use dataflow_core::{EngineError, EngineResult};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextPoolConfig {
    pub size: usize,
}

impl Default for ContextPoolConfig {
    fn default() -> Self {
        Self { size: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactBatcherSectionConfig {
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub high_water_mark: usize,
}

impl Default for ArtifactBatcherSectionConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_interval_ms: 500,
            high_water_mark: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub stage_capacity: usize,
    pub stage_parallelism: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            stage_capacity: 64,
            stage_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub flush_interval_ms: u64,
    pub max_deferred_retries: u32,
    pub database_url: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 250,
            max_deferred_retries: 5,
            database_url: "sqlite::memory:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub context_pool: ContextPoolConfig,
    pub artifact_batcher: ArtifactBatcherSectionConfig,
    pub defaults: DefaultsConfig,
    pub persistence: PersistenceConfig,
}

impl EngineConfig {
    /// Builds configuration from, in ascending precedence: compiled-in
    /// defaults, an optional `pipeline.toml` in the current directory, then
    /// `DATAFLOW_*` environment variables.
    pub fn load() -> EngineResult<Self> {
        let builder = Config::builder()
            .add_source(File::with_name("pipeline").required(false))
            .add_source(Environment::with_prefix("DATAFLOW").separator("__"));
        let config = builder.build().map_err(into_engine_error)?;
        config.try_deserialize().map_err(into_engine_error)
    }

    pub fn persistence_flush_interval(&self) -> Duration {
        Duration::from_millis(self.persistence.flush_interval_ms)
    }

    pub fn artifact_flush_interval(&self) -> Duration {
        Duration::from_millis(self.artifact_batcher.flush_interval_ms)
    }
}

/// `ConfigError` and `EngineError` are both foreign to this crate, so a
/// `From` impl would violate the orphan rule; callers convert explicitly.
pub fn into_engine_error(err: ConfigError) -> EngineError {
    EngineError::InvalidConfiguration(err.to_string())
}
