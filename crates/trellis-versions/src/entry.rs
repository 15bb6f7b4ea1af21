use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trellis_types::{ActorId, ItemId, VersionId};

/// What kind of mutation produced a version entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionEvent {
    /// The item was created with its initial content.
    Created,
    /// A normal content update.
    Updated,
    /// The item's subtree was relocated to another container.
    Moved,
    /// An older snapshot was copied forward as the current content.
    Restored,
    /// The entry belongs to a fresh copy of another item.
    Duplicated,
}

impl fmt::Display for VersionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Moved => "moved",
            Self::Restored => "restored",
            Self::Duplicated => "duplicated",
        };
        write!(f, "{s}")
    }
}

/// One immutable snapshot in an item's history.
///
/// `sequence` is 1-based and strictly increasing per item; it is never
/// reused because entries are never deleted. `author_id` is `None` for
/// system-generated entries. `content` and `metadata` are opaque to the
/// log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: VersionId,
    pub item_id: ItemId,
    pub author_id: Option<ActorId>,
    pub sequence: u64,
    pub content: serde_json::Value,
    pub event: VersionEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A version entry enriched with author display information from the
/// external user directory. This is the shape the listing API returns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedVersion {
    pub id: VersionId,
    pub sequence: u64,
    pub author_id: Option<ActorId>,
    pub author_name: Option<String>,
    pub author_image: Option<String>,
    pub content: serde_json::Value,
    pub event: VersionEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_tag_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&VersionEvent::Moved).unwrap(),
            "\"moved\""
        );
        assert_eq!(VersionEvent::Updated.to_string(), "updated");
    }

    #[test]
    fn entry_wire_shape() {
        let entry = VersionEntry {
            id: VersionId::new(),
            item_id: ItemId::new(),
            author_id: None,
            sequence: 3,
            content: serde_json::json!({"text": "hello"}),
            event: VersionEvent::Updated,
            metadata: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sequence"], 3);
        assert_eq!(json["event"], "updated");
        assert_eq!(json["authorId"], serde_json::Value::Null);
        assert!(json.get("metadata").is_none());
        assert!(json.get("createdAt").is_some());
    }
}
