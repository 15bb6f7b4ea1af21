use serde::{Deserialize, Serialize};
use trellis_types::{ContainerId, ItemId, NodeId};

use crate::path::NodePath;

/// One position in a container's hierarchy. Exactly one per item.
///
/// `parent_id == None` marks a root node (`depth == 0`, single-segment
/// path). `order` is unique among siblings sharing `container_id` +
/// `parent_id`. The row is never physically deleted: a soft-deleted item
/// leaves a tombstoned node behind so its position survives an undo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: NodeId,
    pub container_id: ContainerId,
    pub item_id: ItemId,
    pub parent_id: Option<NodeId>,
    pub path: NodePath,
    pub depth: u32,
    pub order: u32,
}

impl TreeNode {
    /// Returns `true` if this node is a container root.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Result of an atomic subtree relocation.
#[derive(Clone, Debug)]
pub struct MoveOutcome {
    /// The subtree root after the move (new path, order, container).
    pub root: TreeNode,
    /// Container the subtree was moved out of.
    pub source_container: ContainerId,
    /// Total nodes relocated, the root included.
    pub moved_nodes: usize,
}
