// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource-Run Cache
//!
//! Maps `(run_id, resource_id)` to the [`ResourceRunId`] minted for it
//! (§4.7), so every call site that needs the identifier for a resource
//! gets the same one back without a round trip to the store.
//!
//! `get_or_create` is also the enforcement point for the open question the
//! specification leaves unresolved: what happens when a transform-many
//! fan-out produces a child `resource_id` that collides with one already
//! seen in this run. [`DuplicatePolicy::Reject`] (the default; see
//! `DESIGN.md`) treats a second mint attempt for the same key as an error;
//! [`DuplicatePolicy::Allow`] treats it as the same resource and hands back
//! the existing identifier.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dataflow_core::{EngineError, EngineResult, ResourceRunId, RunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    Reject,
    Allow,
}

pub struct ResourceRunCache {
    policy: DuplicatePolicy,
    entries: DashMap<(RunId, String), ResourceRunId>,
}

impl ResourceRunCache {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            entries: DashMap::new(),
        }
    }

    /// Mints a [`ResourceRunId`] the first time `resource_id` is seen under
    /// `run_id`. A second call for the same key is either rejected or
    /// handed the original id back, per [`DuplicatePolicy`].
    pub fn get_or_create(&self, run_id: RunId, resource_id: &str) -> EngineResult<ResourceRunId> {
        match self.entries.entry((run_id, resource_id.to_string())) {
            Entry::Occupied(existing) => match self.policy {
                DuplicatePolicy::Allow => Ok(*existing.get()),
                DuplicatePolicy::Reject => Err(EngineError::DuplicateChildResourceId {
                    run_id: run_id.to_string(),
                    resource_id: resource_id.to_string(),
                }),
            },
            Entry::Vacant(slot) => {
                let id = ResourceRunId::new();
                slot.insert(id);
                Ok(id)
            }
        }
    }

    /// Looks up an id already minted for `resource_id`, without minting one.
    pub fn get(&self, run_id: RunId, resource_id: &str) -> Option<ResourceRunId> {
        self.entries.get(&(run_id, resource_id.to_string())).map(|v| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_policy_errors_on_second_mint() {
        let cache = ResourceRunCache::new(DuplicatePolicy::Reject);
        let run_id = RunId::new();
        let first = cache.get_or_create(run_id, "x").unwrap();
        let err = cache.get_or_create(run_id, "x").unwrap_err();
        assert!(matches!(err, EngineError::DuplicateChildResourceId { .. }));
        assert_eq!(cache.get(run_id, "x"), Some(first));
    }

    #[test]
    fn allow_policy_returns_existing_id() {
        let cache = ResourceRunCache::new(DuplicatePolicy::Allow);
        let run_id = RunId::new();
        let first = cache.get_or_create(run_id, "x").unwrap();
        let second = cache.get_or_create(run_id, "x").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_runs_do_not_collide() {
        let cache = ResourceRunCache::new(DuplicatePolicy::Reject);
        let a = cache.get_or_create(RunId::new(), "x").unwrap();
        let b = cache.get_or_create(RunId::new(), "x").unwrap();
        assert_ne!(a, b);
    }
}
