use trellis_types::{ContainerId, ItemId, NodeId};

use crate::error::TreeResult;
use crate::node::{MoveOutcome, TreeNode};
use crate::path::NodePath;

/// Hierarchical tree store for one deployment's containers.
///
/// All implementations must satisfy these invariants:
/// - At most one node per item, ever. A second `create_node` for the same
///   item is rejected.
/// - A node's path encodes its exact ancestor chain: the k-th segment is
///   `order + 1` of the ancestor at depth k.
/// - `order` is unique among siblings sharing `container_id` + `parent_id`
///   within any single transaction (concurrent callers must serialize
///   above this layer).
/// - Rows are never physically deleted. Soft-deleted items tombstone their
///   node; tombstoned nodes are excluded from listings but still occupy
///   their sibling slot.
/// - `move_subtree` is all-or-nothing: either every node of the subtree is
///   relocated or none is.
pub trait TreeStore: Send + Sync {
    /// Create the node for a newly created item.
    ///
    /// With `parent` set, the node becomes its last child. If the parent
    /// does not resolve, the node is created as a container root instead
    /// (reference behavior; logged at `warn` because it can mask caller
    /// bugs).
    fn create_node(
        &self,
        container: ContainerId,
        item: ItemId,
        parent: Option<NodeId>,
    ) -> TreeResult<TreeNode>;

    /// Read a node by id. `Ok(None)` if absent.
    fn node(&self, id: NodeId) -> TreeResult<Option<TreeNode>>;

    /// Read the node owned by an item. `Ok(None)` if the item has none.
    fn node_for_item(&self, item: ItemId) -> TreeResult<Option<TreeNode>>;

    /// Children of `parent` (roots when `None`), ordered by `order`.
    /// Tombstoned nodes are excluded.
    fn list_children(
        &self,
        container: ContainerId,
        parent: Option<NodeId>,
    ) -> TreeResult<Vec<TreeNode>>;

    /// Every live node in a container, ordered by path. Tombstoned nodes
    /// are excluded.
    fn list_by_container(&self, container: ContainerId) -> TreeResult<Vec<TreeNode>>;

    /// Every node (tombstoned included) whose path starts with `prefix`,
    /// ordered by path. This is the subtree selection used by moves.
    fn subtree(&self, container: ContainerId, prefix: &NodePath) -> TreeResult<Vec<TreeNode>>;

    /// Atomically relocate an item's subtree into `target` as a new last
    /// root. Descendants keep their `depth` and `order`; only the path
    /// prefix changes. Rejects a move into the current container.
    fn move_subtree(&self, item: ItemId, target: ContainerId) -> TreeResult<MoveOutcome>;

    /// Flag an item's node as tombstoned (its item was soft-deleted).
    fn mark_tombstoned(&self, item: ItemId) -> TreeResult<()>;

    /// Clear an item's tombstone (its item was restored).
    fn clear_tombstone(&self, item: ItemId) -> TreeResult<()>;
}
