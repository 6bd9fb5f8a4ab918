// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Entity Identifiers
//!
//! Every persisted entity in the dataflow engine (`Run`, `ResourceRun`,
//! `StepProgress`, `Artifact`) is addressed by a distinct newtype wrapping a
//! ULID. ULIDs are lexicographically sortable by creation time, which keeps
//! index scans on `(resource_run_id, sequence)` and similar ordered without
//! an extra column, and round-trip cleanly through JSON and SQL as text.
//!
//! Each id type implements `Display`, `FromStr`, and `serde`
//! (de)serialization so it can be used directly as a map key, a struct
//! field, or a SQL bind parameter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! entity_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Mints a fresh, time-ordered identifier.
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Wraps an existing ULID, e.g. one read back from storage.
            pub fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            pub fn as_ulid(&self) -> Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Ulid::from_str(s)?))
            }
        }
    };
}

entity_id!(RunId, "Stable unique identifier for one pipeline run.");
entity_id!(
    ResourceRunId,
    "Identifier for one execution of the pipeline for one resource."
);
entity_id!(
    StepProgressId,
    "Identifier for one execution of one stage for one resource-run."
);
entity_id!(ArtifactId, "Identifier for one artifact emitted by a stage.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_from_str() {
        let id = RunId::new();
        let text = id.to_string();
        let parsed: RunId = text.parse().expect("valid ulid text");
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_calls_produce_distinct_ids() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ArtifactId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
