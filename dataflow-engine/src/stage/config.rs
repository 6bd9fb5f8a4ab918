// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Per-stage configuration (§4.4): a `step-name` unique within the graph,
//! a worker-pool width, and an output buffer capacity.

use std::num::NonZeroUsize;

use dataflow_core::{EngineError, EngineResult};

use crate::stage::channel::Capacity;

#[derive(Debug, Clone)]
pub struct StageConfig {
    pub step_name: String,
    pub max_parallelism: NonZeroUsize,
    pub capacity: Capacity,
    pub enable_progress_tracking: bool,
}

impl StageConfig {
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            max_parallelism: NonZeroUsize::new(1).expect("1 is non-zero"),
            capacity: Capacity::Bounded(64),
            enable_progress_tracking: true,
        }
    }

    pub fn with_parallelism(mut self, n: usize) -> EngineResult<Self> {
        self.max_parallelism = NonZeroUsize::new(n)
            .ok_or_else(|| EngineError::InvalidConfiguration("max_parallelism must be at least 1".to_string()))?;
        Ok(self)
    }

    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn without_progress_tracking(mut self) -> Self {
        self.enable_progress_tracking = false;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.step_name.trim().is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "step_name must not be empty".to_string(),
            ));
        }
        if let Capacity::Bounded(0) = self.capacity {
            return Err(EngineError::InvalidConfiguration(
                "bounded capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
