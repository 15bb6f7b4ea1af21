use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TreeError;

/// Materialized path: the position of a node encoded as 1-based ordinal
/// segments from the root down to the node itself.
///
/// The k-th segment equals `order + 1` of the ancestor at depth k, so the
/// textual form (`"1.2.1"`) sorts and prefix-matches structurally: a node
/// belongs to a subtree exactly when its path starts with the subtree
/// root's path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    segments: Vec<u32>,
}

impl NodePath {
    /// Path of a root node with the given sibling `order`.
    pub fn root(order: u32) -> Self {
        Self {
            segments: vec![order + 1],
        }
    }

    /// Path of a child of `self` with the given sibling `order`.
    pub fn child(&self, order: u32) -> Self {
        let mut segments = self.segments.clone();
        segments.push(order + 1);
        Self { segments }
    }

    /// Build from raw 1-based segments. Rejects empty paths and zero
    /// segments.
    pub fn from_segments(segments: Vec<u32>) -> Result<Self, TreeError> {
        if segments.is_empty() {
            return Err(TreeError::InvalidPath("empty path".into()));
        }
        if segments.contains(&0) {
            return Err(TreeError::InvalidPath("segments are 1-based".into()));
        }
        Ok(Self { segments })
    }

    /// The raw 1-based segments.
    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// Depth encoded by this path (root = 0).
    pub fn depth(&self) -> u32 {
        (self.segments.len() - 1) as u32
    }

    /// The sibling `order` values along the ancestor chain, root first.
    /// Each is the corresponding segment minus one.
    pub fn orders(&self) -> Vec<u32> {
        self.segments.iter().map(|s| s - 1).collect()
    }

    /// Returns `true` if `self` lies inside the subtree rooted at `prefix`
    /// (including the root itself).
    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Replace the `old_root` prefix of this path with `new_root`, keeping
    /// the suffix unchanged. Returns `None` if `self` is not inside the
    /// subtree rooted at `old_root`.
    pub fn reroot(&self, old_root: &NodePath, new_root: &NodePath) -> Option<NodePath> {
        if !self.starts_with(old_root) {
            return None;
        }
        let mut segments = new_root.segments.clone();
        segments.extend_from_slice(&self.segments[old_root.segments.len()..]);
        Some(NodePath { segments })
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{seg}")?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath({self})")
    }
}

impl FromStr for NodePath {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| TreeError::InvalidPath(format!("bad segment {part:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_segments(segments)
    }
}

// Paths travel as their textual form on every external surface.
impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
