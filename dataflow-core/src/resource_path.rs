// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource Path
//!
//! A transform-many stage can explode one resource into several children.
//! The progress tracker needs to address both the top-level resource and
//! any of its descendants, so every tracker call takes a [`ResourcePath`]:
//! a non-empty sequence whose head is the top-level resource-id and whose
//! remaining elements are the ids assigned to each successive
//! transform-many fan-out.

use crate::error::EngineError;

/// A non-empty chain of resource ids: `[parent, child, grandchild, ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath(Vec<String>);

impl ResourcePath {
    /// Builds a single-element path for a top-level resource.
    pub fn root(resource_id: impl Into<String>) -> Self {
        Self(vec![resource_id.into()])
    }

    /// Builds a path from an explicit, non-empty list of segments.
    pub fn from_segments(segments: Vec<String>) -> Result<Self, EngineError> {
        if segments.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "resource path must have at least one segment".to_string(),
            ));
        }
        Ok(Self(segments))
    }

    /// Parses the `/`-joined text form an [`crate::envelope::Envelope`]'s
    /// `resource_id` carries, the inverse of [`ResourcePath::to_string`].
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        Self::from_segments(text.split('/').map(str::to_string).collect())
    }

    /// Returns a new path with `child_id` appended, for a transform-many
    /// fan-out of the resource this path currently names.
    pub fn child(&self, child_id: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(child_id.into());
        Self(segments)
    }

    /// The top-level resource-id that owns this path.
    pub fn root_id(&self) -> &str {
        &self.0[0]
    }

    /// The id of the resource this path ultimately names (the leaf).
    pub fn leaf_id(&self) -> &str {
        self.0.last().expect("resource path is never empty")
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }
}

impl std::fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path_has_depth_one() {
        let path = ResourcePath::root("p1");
        assert_eq!(path.depth(), 1);
        assert!(path.is_root());
        assert_eq!(path.root_id(), "p1");
        assert_eq!(path.leaf_id(), "p1");
    }

    #[test]
    fn child_appends_and_preserves_root() {
        let path = ResourcePath::root("p1").child("x");
        assert_eq!(path.depth(), 2);
        assert!(!path.is_root());
        assert_eq!(path.root_id(), "p1");
        assert_eq!(path.leaf_id(), "x");
        assert_eq!(path.to_string(), "p1/x");
    }

    #[test]
    fn from_segments_rejects_empty() {
        assert!(ResourcePath::from_segments(vec![]).is_err());
    }

    #[test]
    fn parse_round_trips_with_display() {
        let path = ResourcePath::root("p1").child("x");
        let parsed = ResourcePath::parse(&path.to_string()).unwrap();
        assert_eq!(path, parsed);
    }

    proptest::proptest! {
        #[test]
        fn parse_display_round_trip(segments in proptest::collection::vec("[a-zA-Z0-9_-]{1,12}", 1..6)) {
            let path = ResourcePath::from_segments(segments).unwrap();
            let parsed = ResourcePath::parse(&path.to_string()).unwrap();
            proptest::prop_assert_eq!(path, parsed);
        }

        #[test]
        fn child_always_deepens_by_one_and_keeps_root(root in "[a-zA-Z0-9_-]{1,12}", child_id in "[a-zA-Z0-9_-]{1,12}") {
            let path = ResourcePath::root(root.clone());
            let child = path.child(child_id.clone());
            proptest::prop_assert_eq!(child.depth(), path.depth() + 1);
            proptest::prop_assert_eq!(child.root_id(), root.as_str());
            proptest::prop_assert_eq!(child.leaf_id(), child_id.as_str());
        }
    }
}
