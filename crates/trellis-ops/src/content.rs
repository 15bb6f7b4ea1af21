use std::sync::Arc;

use trellis_tree::{TreeNode, TreeStore};
use trellis_types::{Actor, ContainerId, GroupId, ItemId, NodeId};
use trellis_versions::{VersionEntry, VersionEvent, VersionLog};

use crate::collab::{ContentRenderer, ItemDirectory, PermissionResolver};
use crate::error::{OpsError, OpsResult};

/// The owning item-update path: creation, content updates, soft delete,
/// and version restore.
///
/// This is the single durable write path. The sync adapter's debounced
/// saves land here, as does a restore (which is just an update whose
/// content happens to be an old snapshot).
pub struct ContentService {
    tree: Arc<dyn TreeStore>,
    versions: Arc<dyn VersionLog>,
    directory: Arc<dyn ItemDirectory>,
    permissions: Arc<dyn PermissionResolver>,
}

impl ContentService {
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
        }
    }

    fn require_write(&self, actor: &Actor, container: ContainerId, action: &str) -> OpsResult<()> {
        if self.permissions.can_write(actor, container) {
            Ok(())
        } else {
            Err(OpsError::PermissionDenied {
                actor: actor.id,
                action: action.to_string(),
            })
        }
    }

    /// Create an item with its tree node and initial version.
    pub fn create_item(
        &self,
        actor: &Actor,
        container: ContainerId,
        group: Option<GroupId>,
        title: &str,
        content: serde_json::Value,
        parent: Option<NodeId>,
    ) -> OpsResult<(ItemId, TreeNode)> {
        self.require_write(actor, container, "create item")?;
        let item = self
            .directory
            .create_item(container, group, title, content.clone())?;
        let node = self.tree.create_node(container, item, parent)?;
        self.versions
            .record(item, Some(actor.id), content, VersionEvent::Created, None)?;
        tracing::info!(%item, path = %node.path, "created item");
        Ok((item, node))
    }

    /// Persist new content and append an `updated` version entry.
    pub fn update_content(
        &self,
        actor: &Actor,
        item: ItemId,
        content: serde_json::Value,
    ) -> OpsResult<VersionEntry> {
        let record = self
            .directory
            .resolve(item)?
            .ok_or(OpsError::ItemNotFound(item))?;
        self.require_write(actor, record.container_id, "update item")?;
        self.directory.set_content(item, content.clone())?;
        let entry =
            self.versions
                .record(item, Some(actor.id), content, VersionEvent::Updated, None)?;
        Ok(entry)
    }

    /// Soft-delete an item: the directory record is flagged and the tree
    /// node tombstoned in place. Nothing is physically removed.
    pub fn soft_delete(&self, actor: &Actor, item: ItemId) -> OpsResult<()> {
        let record = self
            .directory
            .resolve(item)?
            .ok_or(OpsError::ItemNotFound(item))?;
        self.require_write(actor, record.container_id, "delete item")?;
        self.directory.set_deleted(item, true)?;
        self.tree.mark_tombstoned(item)?;
        tracing::info!(%item, "soft-deleted item");
        Ok(())
    }

    /// Undo a soft delete; the node resurfaces in its old position.
    pub fn restore_item(&self, actor: &Actor, item: ItemId) -> OpsResult<()> {
        let record = self
            .directory
            .resolve(item)?
            .ok_or(OpsError::ItemNotFound(item))?;
        self.require_write(actor, record.container_id, "restore item")?;
        self.directory.set_deleted(item, false)?;
        self.tree.clear_tombstone(item)?;
        Ok(())
    }

    /// Restore an item's content to an earlier version.
    ///
    /// History only grows: the old snapshot is appended as a new entry and
    /// becomes the current content; no prior entry is altered.
    pub fn restore_version(
        &self,
        actor: &Actor,
        item: ItemId,
        target_sequence: u64,
    ) -> OpsResult<VersionEntry> {
        let record = self
            .directory
            .resolve(item)?
            .ok_or(OpsError::ItemNotFound(item))?;
        self.require_write(actor, record.container_id, "restore version")?;
        let entry = self
            .versions
            .restore(item, target_sequence, Some(actor.id))?;
        self.directory.set_content(item, entry.content.clone())?;
        tracing::info!(%item, sequence = target_sequence, "restored version");
        Ok(entry)
    }

    /// Render the snapshot at `sequence` as plain text for history export.
    pub fn export_version_text(
        &self,
        item: ItemId,
        sequence: u64,
        renderer: &dyn ContentRenderer,
    ) -> OpsResult<String> {
        let entry = self
            .versions
            .entry_at(item, sequence)?
            .ok_or(OpsError::Version(
                trellis_versions::VersionError::VersionNotFound { item, sequence },
            ))?;
        Ok(renderer.to_plain_text(&entry.content))
    }
}
