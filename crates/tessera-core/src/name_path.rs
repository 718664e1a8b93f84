//! Hierarchical identity of a container or test unit.
//!
//! A [`NamePath`] lists the names of every enclosing scope, root first, with
//! the unit's own name as the last segment. Paths are immutable values: they
//! are built once when a container or unit registers and are used as map keys
//! for per-test state and as the identity shown in reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Ordered, root-to-leaf sequence of name segments
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamePath {
    segments: Arc<[String]>,
}

impl NamePath {
    /// Create a single-segment path
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: Arc::from(vec![name.into()]),
        }
    }

    /// Build a path from segments, root first. Returns `None` for an empty sequence.
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: Arc::from(segments),
        })
    }

    /// Return a new path with `name` as an extra trailing segment
    pub fn append(&self, name: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(name.into());
        Self {
            segments: Arc::from(segments),
        }
    }

    /// The unit's own name (last segment)
    pub fn leaf_name(&self) -> &str {
        // Construction guarantees at least one segment
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The enclosing path, or `None` for a root path
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: Arc::from(&self.segments[..self.segments.len() - 1]),
        })
    }

    /// All segments, root first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// True if `other` is nested strictly below this path
    pub fn is_ancestor_of(&self, other: &NamePath) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(" / "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_append_leaves_receiver_untouched() {
        let spec = NamePath::root("AlphaSpec");
        let nested = spec.append("addition").append("handles overflow");

        assert_eq!(spec.depth(), 1);
        assert_eq!(nested.depth(), 3);
        assert_eq!(nested.leaf_name(), "handles overflow");
        assert_eq!(spec.leaf_name(), "AlphaSpec");
    }

    #[test]
    fn test_structural_equality() {
        let a = NamePath::root("AlphaSpec").append("works");
        let b = NamePath::from_segments(["AlphaSpec", "works"]).unwrap();
        assert_eq!(a, b);

        let mut state = HashMap::new();
        state.insert(a, 1);
        assert_eq!(state.get(&b), Some(&1));
    }

    #[test]
    fn test_empty_segments_rejected() {
        assert!(NamePath::from_segments(Vec::<String>::new()).is_none());
    }

    #[test]
    fn test_parent_and_ancestry() {
        let root = NamePath::root("Spec");
        let leaf = root.append("group").append("case");

        assert_eq!(leaf.parent(), Some(root.append("group")));
        assert!(root.parent().is_none());
        assert!(root.is_ancestor_of(&leaf));
        assert!(!leaf.is_ancestor_of(&root));
        assert!(!leaf.is_ancestor_of(&leaf));
    }

    #[test]
    fn test_display_joins_segments() {
        let path = NamePath::root("Spec").append("case");
        assert_eq!(path.to_string(), "Spec / case");
    }
}
