use trellis_types::{Actor, ContainerId, GroupId, ItemId};

use crate::error::OpsResult;

/// An item as the directory knows it: current container, grouping
/// attribute, title, content snapshot, and soft-delete flag.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub container_id: ContainerId,
    pub group_id: Option<GroupId>,
    pub title: String,
    pub content: serde_json::Value,
    pub deleted: bool,
}

/// External capability check, consumed as a yes/no answer.
///
/// Role and permission computation happens outside this core; a `false`
/// from either method aborts the mutation with `PermissionDenied` before
/// any write.
pub trait PermissionResolver: Send + Sync {
    /// May the actor create or modify content in the container?
    fn can_write(&self, actor: &Actor, container: ContainerId) -> bool;

    /// May the actor restructure the container (move subtrees out of it)?
    fn can_manage(&self, actor: &Actor, container: ContainerId) -> bool;
}

/// External item directory: the system of record for item metadata.
///
/// The tree store holds positions; this collaborator holds everything
/// else about an item. Moves reach through it to keep cross-references
/// (live chat sessions bound to a document, for example) consistent with
/// the item's new container.
pub trait ItemDirectory: Send + Sync {
    /// Resolve an item. `Ok(None)` if unknown.
    fn resolve(&self, item: ItemId) -> OpsResult<Option<ItemRecord>>;

    /// Create a new item and return its id.
    fn create_item(
        &self,
        container: ContainerId,
        group: Option<GroupId>,
        title: &str,
        content: serde_json::Value,
    ) -> OpsResult<ItemId>;

    /// Replace an item's current content.
    fn set_content(&self, item: ItemId, content: serde_json::Value) -> OpsResult<()>;

    /// Reassign an item's grouping attribute.
    fn set_group(&self, item: ItemId, group: Option<GroupId>) -> OpsResult<()>;

    /// Record an item's new owning container.
    fn set_container(&self, item: ItemId, container: ContainerId) -> OpsResult<()>;

    /// Flag or unflag an item as soft-deleted.
    fn set_deleted(&self, item: ItemId, deleted: bool) -> OpsResult<()>;

    /// Repoint every record that references the item by
    /// `(item, old_container)` at the new container. Returns how many
    /// records were rebound.
    fn rebind_container(
        &self,
        item: ItemId,
        old_container: ContainerId,
        new_container: ContainerId,
    ) -> OpsResult<usize>;

    /// Does the group exist inside the given container?
    fn group_exists(&self, container: ContainerId, group: GroupId) -> OpsResult<bool>;

    /// Display name of a container, if known.
    fn container_name(&self, container: ContainerId) -> OpsResult<Option<String>>;
}

/// Pure renderer from opaque document content to plain text.
///
/// Used only by version-history export; never by mutation paths.
pub trait ContentRenderer: Send + Sync {
    fn to_plain_text(&self, content: &serde_json::Value) -> String;
}
