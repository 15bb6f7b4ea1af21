use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use trellis_tree::{MoveOutcome, TreeStore};
use trellis_types::{Actor, ContainerId, GroupId, ItemId};
use trellis_versions::{VersionEvent, VersionLog};

use crate::collab::{ItemDirectory, ItemRecord, PermissionResolver};
use crate::error::{OpsError, OpsResult};

/// Transaction manager for relocating, duplicating, and regrouping items.
///
/// Validation and permission checks run before any write; the tree store
/// applies the structural change atomically under its own lock; moves into
/// the same target container are serialized through a keyed mutex so two
/// concurrent moves cannot mint the same root slot.
pub struct MoveManager {
    tree: Arc<dyn TreeStore>,
    versions: Arc<dyn VersionLog>,
    directory: Arc<dyn ItemDirectory>,
    permissions: Arc<dyn PermissionResolver>,
    move_locks: Mutex<HashMap<ContainerId, Arc<Mutex<()>>>>,
}

impl MoveManager {
    pub fn new(
        tree: Arc<dyn TreeStore>,
        versions: Arc<dyn VersionLog>,
        directory: Arc<dyn ItemDirectory>,
        permissions: Arc<dyn PermissionResolver>,
    ) -> Self {
        Self {
            tree,
            versions,
            directory,
            permissions,
            move_locks: Mutex::new(HashMap::new()),
        }
    }

    fn resolve_required(&self, item: ItemId) -> OpsResult<ItemRecord> {
        self.directory
            .resolve(item)?
            .ok_or(OpsError::ItemNotFound(item))
    }

    fn lock_for_target(&self, target: ContainerId) -> Arc<Mutex<()>> {
        let mut locks = self.move_locks.lock().expect("lock poisoned");
        Arc::clone(locks.entry(target).or_default())
    }

    /// Copy an item into a new sibling of its own node.
    ///
    /// The copy lands in the same container and the same group, its node
    /// directly after the current last sibling. The original is untouched.
    pub fn duplicate_item(&self, actor: &Actor, item: ItemId) -> OpsResult<ItemId> {
        let record = self.resolve_required(item)?;
        if !self.permissions.can_write(actor, record.container_id) {
            return Err(OpsError::PermissionDenied {
                actor: actor.id,
                action: format!("duplicate item {item}"),
            });
        }
        let node = self
            .tree
            .node_for_item(item)?
            .ok_or(OpsError::ItemNotFound(item))?;

        let new_item = self.directory.create_item(
            record.container_id,
            record.group_id,
            &record.title,
            record.content.clone(),
        )?;
        self.tree
            .create_node(record.container_id, new_item, node.parent_id)?;
        self.versions.record(
            new_item,
            Some(actor.id),
            record.content,
            VersionEvent::Duplicated,
            Some(serde_json::json!({ "sourceItem": item.to_string() })),
        )?;
        tracing::info!(source = %item, copy = %new_item, "duplicated item");
        Ok(new_item)
    }

    /// Relocate an item and its entire subtree into another container.
    ///
    /// The moved node becomes the target's last root; descendants keep
    /// their relative depth and order. One version entry tagged `moved` is
    /// appended, and records referencing the item by its old container are
    /// rebound to the new one.
    pub fn move_subtree(
        &self,
        actor: &Actor,
        item: ItemId,
        target: ContainerId,
    ) -> OpsResult<MoveOutcome> {
        let record = self.resolve_required(item)?;
        if record.container_id == target {
            return Err(OpsError::SameContainer(item));
        }
        if !self.permissions.can_manage(actor, record.container_id) {
            return Err(OpsError::PermissionDenied {
                actor: actor.id,
                action: format!("move item {item} out of {}", record.container_id),
            });
        }
        if !self.permissions.can_write(actor, target) {
            return Err(OpsError::PermissionDenied {
                actor: actor.id,
                action: format!("move item {item} into {target}"),
            });
        }

        // Serialize against other moves into the same container; root
        // slot assignment in the target must not race.
        let target_lock = self.lock_for_target(target);
        let _guard = target_lock.lock().expect("lock poisoned");

        let outcome = self.tree.move_subtree(item, target)?;
        self.directory.set_container(item, target)?;
        let rebound =
            self.directory
                .rebind_container(item, outcome.source_container, target)?;

        let source_name = self
            .directory
            .container_name(outcome.source_container)?
            .unwrap_or_else(|| outcome.source_container.to_string());
        let target_name = self
            .directory
            .container_name(target)?
            .unwrap_or_else(|| target.to_string());
        self.versions.record(
            item,
            Some(actor.id),
            record.content,
            VersionEvent::Moved,
            Some(serde_json::json!({
                "sourceContainer": source_name,
                "targetContainer": target_name,
            })),
        )?;

        tracing::info!(
            %item,
            target = %target,
            nodes = outcome.moved_nodes,
            rebound,
            "moved subtree"
        );
        Ok(outcome)
    }

    /// Reassign an item's grouping attribute without touching the tree.
    ///
    /// The target group must exist in the item's own container; moving to
    /// the group the item is already in is rejected.
    pub fn reassign_group(
        &self,
        actor: &Actor,
        item: ItemId,
        target_group: Option<GroupId>,
    ) -> OpsResult<()> {
        let record = self.resolve_required(item)?;
        if !self.permissions.can_write(actor, record.container_id) {
            return Err(OpsError::PermissionDenied {
                actor: actor.id,
                action: format!("regroup item {item}"),
            });
        }
        if record.group_id == target_group {
            return Err(OpsError::GroupUnchanged(item));
        }
        if let Some(group) = target_group {
            if !self.directory.group_exists(record.container_id, group)? {
                return Err(OpsError::GroupNotFound {
                    group,
                    container: record.container_id,
                });
            }
        }
        self.directory.set_group(item, target_group)?;
        tracing::debug!(%item, group = ?target_group, "reassigned group");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryItemDirectory, StaticPermissions};
    use trellis_tree::InMemoryTreeStore;
    use trellis_types::ActorId;
    use trellis_versions::InMemoryVersionLog;

    struct Fixture {
        tree: Arc<InMemoryTreeStore>,
        versions: Arc<InMemoryVersionLog>,
        directory: Arc<InMemoryItemDirectory>,
        manager: MoveManager,
        actor: Actor,
    }

    fn fixture(permissions: StaticPermissions) -> Fixture {
        let tree = Arc::new(InMemoryTreeStore::new());
        let versions = Arc::new(InMemoryVersionLog::new());
        let directory = Arc::new(InMemoryItemDirectory::new());
        let manager = MoveManager::new(
            tree.clone(),
            versions.clone(),
            directory.clone(),
            Arc::new(permissions),
        );
        let actor = Actor::new(ActorId::new(), "Ada").unwrap();
        Fixture {
            tree,
            versions,
            directory,
            manager,
            actor,
        }
    }

    fn seed_item(
        fx: &Fixture,
        container: ContainerId,
        parent: Option<trellis_types::NodeId>,
    ) -> ItemId {
        let item = fx
            .directory
            .create_item(container, None, "Doc", serde_json::json!({"text": "hi"}))
            .unwrap();
        fx.tree.create_node(container, item, parent).unwrap();
        item
    }

    // -----------------------------------------------------------------------
    // duplicate_item
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_creates_distinct_sibling() {
        let fx = fixture(StaticPermissions::allow_all());
        let w = fx.directory.register_container("W");
        let item = seed_item(&fx, w, None);
        let original = fx.tree.node_for_item(item).unwrap().unwrap();

        let copy = fx.manager.duplicate_item(&fx.actor, item).unwrap();
        let copy_node = fx.tree.node_for_item(copy).unwrap().unwrap();

        assert_eq!(copy_node.parent_id, original.parent_id);
        assert_eq!(copy_node.order, 1);
        assert_ne!(copy_node.path, original.path);
        // Content and group carried over.
        let record = fx.directory.resolve(copy).unwrap().unwrap();
        assert_eq!(record.content, serde_json::json!({"text": "hi"}));
        // One Duplicated version for the copy.
        let versions = fx.versions.list(copy).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].event, VersionEvent::Duplicated);
    }

    #[test]
    fn duplicate_never_collides_under_repeat() {
        let fx = fixture(StaticPermissions::allow_all());
        let w = fx.directory.register_container("W");
        let parent_item = seed_item(&fx, w, None);
        let parent_node = fx.tree.node_for_item(parent_item).unwrap().unwrap();
        let child = seed_item(&fx, w, Some(parent_node.id));

        let mut paths = vec![fx.tree.node_for_item(child).unwrap().unwrap().path];
        for _ in 0..3 {
            let copy = fx.manager.duplicate_item(&fx.actor, child).unwrap();
            paths.push(fx.tree.node_for_item(copy).unwrap().unwrap().path);
        }
        let unique: std::collections::HashSet<String> =
            paths.iter().map(|p| p.to_string()).collect();
        assert_eq!(unique.len(), paths.len());
    }

    #[test]
    fn duplicate_denied_without_write() {
        let fx = fixture(StaticPermissions::deny_all());
        let w = fx.directory.register_container("W");
        let item = seed_item(&fx, w, None);
        let err = fx.manager.duplicate_item(&fx.actor, item).unwrap_err();
        assert!(matches!(err, OpsError::PermissionDenied { .. }));
        // Nothing was written.
        assert_eq!(fx.tree.len(), 1);
    }

    #[test]
    fn duplicate_unknown_item() {
        let fx = fixture(StaticPermissions::allow_all());
        let item = ItemId::new();
        let err = fx.manager.duplicate_item(&fx.actor, item).unwrap_err();
        assert_eq!(err, OpsError::ItemNotFound(item));
    }

    // -----------------------------------------------------------------------
    // move_subtree
    // -----------------------------------------------------------------------

    #[test]
    fn move_appends_tagged_version_and_rebinds() {
        let fx = fixture(StaticPermissions::allow_all());
        let w1 = fx.directory.register_container("Source");
        let w2 = fx.directory.register_container("Target");
        let item = seed_item(&fx, w1, None);
        fx.directory.bind_session(item, w1);

        let outcome = fx.manager.move_subtree(&fx.actor, item, w2).unwrap();
        assert_eq!(outcome.root.container_id, w2);

        // Directory reflects the new container, bindings followed.
        let record = fx.directory.resolve(item).unwrap().unwrap();
        assert_eq!(record.container_id, w2);
        assert_eq!(fx.directory.bindings_for(item), vec![w2]);

        // Exactly one version tagged moved, naming both containers.
        let versions = fx.versions.list(item).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].event, VersionEvent::Moved);
        let metadata = versions[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["sourceContainer"], "Source");
        assert_eq!(metadata["targetContainer"], "Target");
    }

    #[test]
    fn move_into_current_container_is_invalid() {
        let fx = fixture(StaticPermissions::allow_all());
        let w = fx.directory.register_container("W");
        let item = seed_item(&fx, w, None);
        let err = fx.manager.move_subtree(&fx.actor, item, w).unwrap_err();
        assert_eq!(err, OpsError::SameContainer(item));
    }

    #[test]
    fn move_denied_before_any_write() {
        let fx = fixture(StaticPermissions::deny_all());
        let w1 = fx.directory.register_container("One");
        let w2 = fx.directory.register_container("Two");
        let item = seed_item(&fx, w1, None);

        let err = fx.manager.move_subtree(&fx.actor, item, w2).unwrap_err();
        assert!(matches!(err, OpsError::PermissionDenied { .. }));
        let record = fx.directory.resolve(item).unwrap().unwrap();
        assert_eq!(record.container_id, w1);
        assert!(fx.versions.list(item).unwrap().is_empty());
    }

    #[test]
    fn concurrent_moves_into_same_target_get_distinct_slots() {
        use std::thread;

        let fx = Arc::new(fixture(StaticPermissions::allow_all()));
        let w1 = fx.directory.register_container("One");
        let w2 = fx.directory.register_container("Two");
        let target = fx.directory.register_container("Target");
        let a = seed_item(&fx, w1, None);
        let b = seed_item(&fx, w2, None);

        let handles: Vec<_> = [a, b]
            .into_iter()
            .map(|item| {
                let fx = Arc::clone(&fx);
                thread::spawn(move || fx.manager.move_subtree(&fx.actor, item, target).unwrap())
            })
            .collect();
        let mut orders: Vec<u32> = handles
            .into_iter()
            .map(|h| h.join().unwrap().root.order)
            .collect();
        orders.sort();
        assert_eq!(orders, vec![0, 1]);
    }

    // -----------------------------------------------------------------------
    // reassign_group
    // -----------------------------------------------------------------------

    #[test]
    fn reassign_group_updates_attribute_only() {
        let fx = fixture(StaticPermissions::allow_all());
        let w = fx.directory.register_container("W");
        let group = fx.directory.register_group(w);
        let item = seed_item(&fx, w, None);
        let node_before = fx.tree.node_for_item(item).unwrap().unwrap();

        fx.manager
            .reassign_group(&fx.actor, item, Some(group))
            .unwrap();
        let record = fx.directory.resolve(item).unwrap().unwrap();
        assert_eq!(record.group_id, Some(group));
        // The tree is untouched.
        assert_eq!(fx.tree.node_for_item(item).unwrap().unwrap(), node_before);
    }

    #[test]
    fn reassign_to_current_group_is_invalid() {
        let fx = fixture(StaticPermissions::allow_all());
        let w = fx.directory.register_container("W");
        let item = seed_item(&fx, w, None);
        let err = fx
            .manager
            .reassign_group(&fx.actor, item, None)
            .unwrap_err();
        assert_eq!(err, OpsError::GroupUnchanged(item));
    }

    #[test]
    fn reassign_to_foreign_group_is_not_found() {
        let fx = fixture(StaticPermissions::allow_all());
        let w1 = fx.directory.register_container("One");
        let w2 = fx.directory.register_container("Two");
        let foreign_group = fx.directory.register_group(w2);
        let item = seed_item(&fx, w1, None);

        let err = fx
            .manager
            .reassign_group(&fx.actor, item, Some(foreign_group))
            .unwrap_err();
        assert_eq!(
            err,
            OpsError::GroupNotFound {
                group: foreign_group,
                container: w1
            }
        );
    }
}
