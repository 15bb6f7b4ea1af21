use trellis_types::{ActorId, ItemId};

use crate::entry::{AnnotatedVersion, VersionEntry, VersionEvent};
use crate::error::{VersionError, VersionResult};

/// Author display information sourced from the external user directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub image: Option<String>,
}

/// External collaborator resolving actors to display profiles.
///
/// Trellis does not own user records; version listings borrow display
/// names through this seam. Unknown actors simply yield no annotation.
pub trait UserDirectory: Send + Sync {
    fn profile(&self, actor: ActorId) -> Option<UserProfile>;
}

/// Append-only per-item version log.
///
/// All implementations must satisfy these invariants:
/// - `sequence` strictly increases per item and is never reused.
/// - Entries are immutable once appended; nothing is ever rewritten or
///   deleted.
/// - Sequence assignment is atomic with the append: two concurrent
///   `record` calls for the same item can never observe the same next
///   sequence.
pub trait VersionLog: Send + Sync {
    /// Append a new entry with the next sequence number for `item`.
    fn record(
        &self,
        item: ItemId,
        author: Option<ActorId>,
        content: serde_json::Value,
        event: VersionEvent,
        metadata: Option<serde_json::Value>,
    ) -> VersionResult<VersionEntry>;

    /// All entries for an item, descending by sequence.
    fn list(&self, item: ItemId) -> VersionResult<Vec<VersionEntry>>;

    /// The entry at an exact sequence. `Ok(None)` if absent.
    fn entry_at(&self, item: ItemId, sequence: u64) -> VersionResult<Option<VersionEntry>>;

    /// The most recent entry for an item.
    fn head(&self, item: ItemId) -> VersionResult<Option<VersionEntry>>;

    /// The highest sequence recorded for an item (0 if none).
    fn current_sequence(&self, item: ItemId) -> VersionResult<u64>;

    /// Copy the snapshot at `target_sequence` forward as a new entry.
    ///
    /// A restore is itself a version: history strictly grows by one and no
    /// prior entry is touched. The caller is responsible for updating the
    /// item's current content to match.
    fn restore(
        &self,
        item: ItemId,
        target_sequence: u64,
        author: Option<ActorId>,
    ) -> VersionResult<VersionEntry> {
        let target = self
            .entry_at(item, target_sequence)?
            .ok_or(VersionError::VersionNotFound {
                item,
                sequence: target_sequence,
            })?;
        self.record(
            item,
            author,
            target.content.clone(),
            VersionEvent::Restored,
            Some(serde_json::json!({ "restoredFrom": target_sequence })),
        )
    }

    /// All entries annotated with author display information.
    fn list_annotated(
        &self,
        item: ItemId,
        directory: &dyn UserDirectory,
    ) -> VersionResult<Vec<AnnotatedVersion>> {
        let entries = self.list(item)?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let profile = entry.author_id.and_then(|a| directory.profile(a));
                let (author_name, author_image) = match profile {
                    Some(p) => (Some(p.name), p.image),
                    None => (None, None),
                };
                AnnotatedVersion {
                    id: entry.id,
                    sequence: entry.sequence,
                    author_id: entry.author_id,
                    author_name,
                    author_image,
                    content: entry.content,
                    event: entry.event,
                    metadata: entry.metadata,
                    created_at: entry.created_at,
                }
            })
            .collect())
    }
}
