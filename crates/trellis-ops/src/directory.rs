use std::collections::HashMap;
use std::sync::RwLock;

use trellis_types::{Actor, ContainerId, GroupId, ItemId};

use crate::collab::{ContentRenderer, ItemDirectory, ItemRecord, PermissionResolver};
use crate::error::{OpsError, OpsResult};

/// In-memory item directory for tests and embedding.
///
/// Besides item records it tracks registered containers/groups and a set
/// of container-scoped bindings standing in for external records that
/// reference an item by `(item, container)` — the live chat sessions of
/// the real deployment.
pub struct InMemoryItemDirectory {
    inner: RwLock<DirectoryState>,
}

#[derive(Default)]
struct DirectoryState {
    items: HashMap<ItemId, ItemRecord>,
    containers: HashMap<ContainerId, String>,
    groups: HashMap<GroupId, ContainerId>,
    bindings: Vec<(ItemId, ContainerId)>,
}

impl InMemoryItemDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(DirectoryState::default()),
        }
    }

    /// Register a container under a display name.
    pub fn register_container(&self, name: &str) -> ContainerId {
        let id = ContainerId::new();
        self.inner
            .write()
            .expect("lock poisoned")
            .containers
            .insert(id, name.to_string());
        id
    }

    /// Register a group inside a container.
    pub fn register_group(&self, container: ContainerId) -> GroupId {
        let id = GroupId::new();
        self.inner
            .write()
            .expect("lock poisoned")
            .groups
            .insert(id, container);
        id
    }

    /// Bind an external record (e.g. a live chat session) to an item in a
    /// container.
    pub fn bind_session(&self, item: ItemId, container: ContainerId) {
        self.inner
            .write()
            .expect("lock poisoned")
            .bindings
            .push((item, container));
    }

    /// Containers the item's external records are currently bound to.
    pub fn bindings_for(&self, item: ItemId) -> Vec<ContainerId> {
        self.inner
            .read()
            .expect("lock poisoned")
            .bindings
            .iter()
            .filter(|(i, _)| *i == item)
            .map(|(_, c)| *c)
            .collect()
    }
}

impl Default for InMemoryItemDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemDirectory for InMemoryItemDirectory {
    fn resolve(&self, item: ItemId) -> OpsResult<Option<ItemRecord>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.items.get(&item).cloned())
    }

    fn create_item(
        &self,
        container: ContainerId,
        group: Option<GroupId>,
        title: &str,
        content: serde_json::Value,
    ) -> OpsResult<ItemId> {
        let mut state = self.inner.write().expect("lock poisoned");
        let id = ItemId::new();
        state.items.insert(
            id,
            ItemRecord {
                id,
                container_id: container,
                group_id: group,
                title: title.to_string(),
                content,
                deleted: false,
            },
        );
        Ok(id)
    }

    fn set_content(&self, item: ItemId, content: serde_json::Value) -> OpsResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        let record = state
            .items
            .get_mut(&item)
            .ok_or(OpsError::ItemNotFound(item))?;
        record.content = content;
        Ok(())
    }

    fn set_group(&self, item: ItemId, group: Option<GroupId>) -> OpsResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        let record = state
            .items
            .get_mut(&item)
            .ok_or(OpsError::ItemNotFound(item))?;
        record.group_id = group;
        Ok(())
    }

    fn set_container(&self, item: ItemId, container: ContainerId) -> OpsResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        let record = state
            .items
            .get_mut(&item)
            .ok_or(OpsError::ItemNotFound(item))?;
        record.container_id = container;
        Ok(())
    }

    fn set_deleted(&self, item: ItemId, deleted: bool) -> OpsResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        let record = state
            .items
            .get_mut(&item)
            .ok_or(OpsError::ItemNotFound(item))?;
        record.deleted = deleted;
        Ok(())
    }

    fn rebind_container(
        &self,
        item: ItemId,
        old_container: ContainerId,
        new_container: ContainerId,
    ) -> OpsResult<usize> {
        let mut state = self.inner.write().expect("lock poisoned");
        let mut rebound = 0;
        for binding in state.bindings.iter_mut() {
            if binding.0 == item && binding.1 == old_container {
                binding.1 = new_container;
                rebound += 1;
            }
        }
        Ok(rebound)
    }

    fn group_exists(&self, container: ContainerId, group: GroupId) -> OpsResult<bool> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.groups.get(&group) == Some(&container))
    }

    fn container_name(&self, container: ContainerId) -> OpsResult<Option<String>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.containers.get(&container).cloned())
    }
}

impl std::fmt::Debug for InMemoryItemDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read().expect("lock poisoned");
        f.debug_struct("InMemoryItemDirectory")
            .field("item_count", &state.items.len())
            .field("container_count", &state.containers.len())
            .finish()
    }
}

/// Fixed-answer permission resolver for tests and embedding.
#[derive(Clone, Copy, Debug)]
pub struct StaticPermissions {
    pub write: bool,
    pub manage: bool,
}

impl StaticPermissions {
    /// Grants everything.
    pub fn allow_all() -> Self {
        Self {
            write: true,
            manage: true,
        }
    }

    /// Denies everything.
    pub fn deny_all() -> Self {
        Self {
            write: false,
            manage: false,
        }
    }
}

impl PermissionResolver for StaticPermissions {
    fn can_write(&self, _actor: &Actor, _container: ContainerId) -> bool {
        self.write
    }

    fn can_manage(&self, _actor: &Actor, _container: ContainerId) -> bool {
        self.manage
    }
}

/// Renderer that flattens the `"text"` leaves of an opaque document into
/// newline-joined plain text.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextRenderer;

impl PlainTextRenderer {
    fn collect(value: &serde_json::Value, out: &mut Vec<String>) {
        match value {
            serde_json::Value::String(s) => out.push(s.clone()),
            serde_json::Value::Array(items) => {
                for item in items {
                    Self::collect(item, out);
                }
            }
            serde_json::Value::Object(map) => {
                if let Some(serde_json::Value::String(s)) = map.get("text") {
                    out.push(s.clone());
                }
                // Only containers recurse; bare string attributes like
                // "type" are markup, not content.
                for child in map.values() {
                    if child.is_array() || child.is_object() {
                        Self::collect(child, out);
                    }
                }
            }
            _ => {}
        }
    }
}

impl ContentRenderer for PlainTextRenderer {
    fn to_plain_text(&self, content: &serde_json::Value) -> String {
        let mut parts = Vec::new();
        Self::collect(content, &mut parts);
        parts.join("\n")
    }
}
