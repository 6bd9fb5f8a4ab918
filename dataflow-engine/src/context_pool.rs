// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Context Pool
//!
//! Two-level resource governance (§4.10 supplement), same idea as the
//! CPU/IO token split this engine's teacher used for file processing: stage
//! parallelism is governed per-stage by [`crate::stage::config::StageConfig`],
//! while the number of persistence operations in flight against the store
//! at any moment is capped independently, here, by a single semaphore. A
//! pipeline with 64-way stage parallelism does not get to open 64
//! concurrent bulk writes against a store that only tolerates a handful of
//! concurrent transactions.

use std::sync::Arc;

use dataflow_core::EngineResult;
use tokio::sync::{Semaphore, SemaphorePermit};

pub struct ContextPool {
    tokens: Arc<Semaphore>,
}

/// An RAII lease on the pool. Dropping it returns the token.
pub struct ContextLease<'a> {
    _permit: SemaphorePermit<'a>,
}

impl ContextPool {
    pub fn new(size: usize) -> Self {
        Self {
            tokens: Arc::new(Semaphore::new(size.max(1))),
        }
    }

    /// Waits for a free token. Only fails if the pool has been shut down
    /// (semaphore closed), which this engine never does mid-run.
    pub async fn acquire(&self) -> EngineResult<ContextLease<'_>> {
        let permit = self
            .tokens
            .acquire()
            .await
            .expect("context pool semaphore is never closed while a run is active");
        Ok(ContextLease { _permit: permit })
    }

    pub fn available(&self) -> usize {
        self.tokens.available_permits()
    }
}
