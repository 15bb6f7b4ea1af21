use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use trellis_types::{ContainerId, ItemId, NodeId};

use crate::error::{TreeError, TreeResult};
use crate::node::{MoveOutcome, TreeNode};
use crate::path::NodePath;
use crate::traits::TreeStore;

/// In-memory, HashMap-based tree store.
///
/// Intended for tests and embedding. All nodes are held in memory behind a
/// `RwLock`; every mutating operation runs under the write lock, so each
/// call is atomic with respect to every other call on the same store.
pub struct InMemoryTreeStore {
    inner: RwLock<TreeState>,
}

#[derive(Default)]
struct TreeState {
    nodes: HashMap<NodeId, TreeNode>,
    by_item: HashMap<ItemId, NodeId>,
    tombstoned: HashSet<ItemId>,
}

impl TreeState {
    /// Number of existing sibling slots under `(container, parent)`.
    /// Tombstoned nodes still occupy their slot, so they count.
    fn sibling_count(&self, container: ContainerId, parent: Option<NodeId>) -> u32 {
        self.nodes
            .values()
            .filter(|n| n.container_id == container && n.parent_id == parent)
            .count() as u32
    }
}

impl InMemoryTreeStore {
    /// Create a new empty tree store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TreeState::default()),
        }
    }

    /// Number of nodes currently stored, tombstoned included.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").nodes.len()
    }

    /// Returns `true` if the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("lock poisoned").nodes.is_empty()
    }
}

impl Default for InMemoryTreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStore for InMemoryTreeStore {
    fn create_node(
        &self,
        container: ContainerId,
        item: ItemId,
        parent: Option<NodeId>,
    ) -> TreeResult<TreeNode> {
        let mut state = self.inner.write().expect("lock poisoned");
        if state.by_item.contains_key(&item) {
            return Err(TreeError::NodeAlreadyExists(item));
        }

        // Resolve the parent up front. A parent that does not exist (or
        // lives in another container) degrades to root creation, matching
        // the reference behavior. Logged because it can mask caller bugs.
        let resolved = parent.and_then(|pid| {
            let found = state
                .nodes
                .get(&pid)
                .filter(|p| p.container_id == container)
                .cloned();
            if found.is_none() {
                tracing::warn!(
                    parent = %pid,
                    %item,
                    "parent not found in container; creating root node instead"
                );
            }
            found
        });

        let (parent_id, depth, order, path) = match resolved {
            Some(p) => {
                let order = state.sibling_count(container, Some(p.id));
                (Some(p.id), p.depth + 1, order, p.path.child(order))
            }
            None => {
                let order = state.sibling_count(container, None);
                (None, 0, order, NodePath::root(order))
            }
        };

        let node = TreeNode {
            id: NodeId::new(),
            container_id: container,
            item_id: item,
            parent_id,
            path,
            depth,
            order,
        };
        state.by_item.insert(item, node.id);
        state.nodes.insert(node.id, node.clone());
        tracing::debug!(node = %node.id, %item, path = %node.path, "created tree node");
        Ok(node)
    }

    fn node(&self, id: NodeId) -> TreeResult<Option<TreeNode>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.nodes.get(&id).cloned())
    }

    fn node_for_item(&self, item: ItemId) -> TreeResult<Option<TreeNode>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state
            .by_item
            .get(&item)
            .and_then(|id| state.nodes.get(id))
            .cloned())
    }

    fn list_children(
        &self,
        container: ContainerId,
        parent: Option<NodeId>,
    ) -> TreeResult<Vec<TreeNode>> {
        let state = self.inner.read().expect("lock poisoned");
        let mut children: Vec<TreeNode> = state
            .nodes
            .values()
            .filter(|n| {
                n.container_id == container
                    && n.parent_id == parent
                    && !state.tombstoned.contains(&n.item_id)
            })
            .cloned()
            .collect();
        children.sort_by_key(|n| n.order);
        Ok(children)
    }

    fn list_by_container(&self, container: ContainerId) -> TreeResult<Vec<TreeNode>> {
        let state = self.inner.read().expect("lock poisoned");
        let mut nodes: Vec<TreeNode> = state
            .nodes
            .values()
            .filter(|n| n.container_id == container && !state.tombstoned.contains(&n.item_id))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(nodes)
    }

    fn subtree(&self, container: ContainerId, prefix: &NodePath) -> TreeResult<Vec<TreeNode>> {
        let state = self.inner.read().expect("lock poisoned");
        let mut nodes: Vec<TreeNode> = state
            .nodes
            .values()
            .filter(|n| n.container_id == container && n.path.starts_with(prefix))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(nodes)
    }

    fn move_subtree(&self, item: ItemId, target: ContainerId) -> TreeResult<MoveOutcome> {
        let mut state = self.inner.write().expect("lock poisoned");
        let root_id = *state
            .by_item
            .get(&item)
            .ok_or(TreeError::ItemNotFound(item))?;
        let root = state
            .nodes
            .get(&root_id)
            .cloned()
            .ok_or(TreeError::NodeNotFound(root_id))?;
        if root.container_id == target {
            return Err(TreeError::AlreadyInContainer(item, target));
        }

        let source = root.container_id;
        let new_order = state.sibling_count(target, None);
        let new_root_path = NodePath::root(new_order);

        // Select the whole subtree by path prefix, then stage every new
        // path before touching anything so the apply phase cannot fail
        // halfway through.
        let members: Vec<NodeId> = state
            .nodes
            .values()
            .filter(|n| n.container_id == source && n.path.starts_with(&root.path))
            .map(|n| n.id)
            .collect();
        let mut staged = Vec::with_capacity(members.len());
        for id in &members {
            let node = state
                .nodes
                .get(id)
                .ok_or(TreeError::NodeNotFound(*id))?;
            let new_path = node
                .path
                .reroot(&root.path, &new_root_path)
                .ok_or_else(|| {
                    TreeError::TransactionFailure(format!(
                        "node {id} selected outside the moved subtree"
                    ))
                })?;
            staged.push((*id, new_path));
        }

        for (id, new_path) in staged {
            if let Some(node) = state.nodes.get_mut(&id) {
                node.container_id = target;
                node.path = new_path;
                if id == root_id {
                    // Only the subtree root becomes a root of the target
                    // container. Descendants keep depth and order: their
                    // position relative to the root is invariant under
                    // relocation.
                    node.parent_id = None;
                    node.depth = 0;
                    node.order = new_order;
                }
            }
        }

        let moved_root = state
            .nodes
            .get(&root_id)
            .cloned()
            .ok_or(TreeError::NodeNotFound(root_id))?;
        tracing::info!(
            %item,
            source = %source,
            target = %target,
            nodes = members.len(),
            "moved subtree across containers"
        );
        Ok(MoveOutcome {
            root: moved_root,
            source_container: source,
            moved_nodes: members.len(),
        })
    }

    fn mark_tombstoned(&self, item: ItemId) -> TreeResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        if !state.by_item.contains_key(&item) {
            return Err(TreeError::ItemNotFound(item));
        }
        state.tombstoned.insert(item);
        Ok(())
    }

    fn clear_tombstone(&self, item: ItemId) -> TreeResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        if !state.by_item.contains_key(&item) {
            return Err(TreeError::ItemNotFound(item));
        }
        state.tombstoned.remove(&item);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryTreeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTreeStore")
            .field("node_count", &self.len())
            .finish()
    }
}
