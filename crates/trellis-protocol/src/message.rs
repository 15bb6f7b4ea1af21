use serde::{Deserialize, Serialize};
use trellis_types::{ItemId, SenderId};

/// All message types in the relay protocol.
///
/// Every frame names the item it concerns and the ephemeral sender that
/// produced it; the relay uses the pair for routing and self-echo
/// suppression and never inspects `content`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayMessage {
    /// Register interest in an item's live edits.
    #[serde(rename_all = "camelCase")]
    Join { item_id: ItemId, sender_id: SenderId },

    /// Full-document broadcast; the receiver replaces local state
    /// wholesale.
    #[serde(rename_all = "camelCase")]
    Content {
        item_id: ItemId,
        sender_id: SenderId,
        content: serde_json::Value,
    },

    /// Ephemeral presence: caret/selection position. Fan-out only, never
    /// persisted.
    #[serde(rename_all = "camelCase")]
    Cursor {
        item_id: ItemId,
        sender_id: SenderId,
        from: u32,
        to: u32,
        name: String,
        color: String,
    },

    /// Clean deregistration before closing the socket.
    #[serde(rename_all = "camelCase")]
    Leave { item_id: ItemId, sender_id: SenderId },
}

impl RelayMessage {
    /// The item this frame concerns.
    pub fn item_id(&self) -> ItemId {
        match self {
            Self::Join { item_id, .. }
            | Self::Content { item_id, .. }
            | Self::Cursor { item_id, .. }
            | Self::Leave { item_id, .. } => *item_id,
        }
    }

    /// The ephemeral session that produced this frame.
    pub fn sender_id(&self) -> SenderId {
        match self {
            Self::Join { sender_id, .. }
            | Self::Content { sender_id, .. }
            | Self::Cursor { sender_id, .. }
            | Self::Leave { sender_id, .. } => *sender_id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Content { .. } => "content",
            Self::Cursor { .. } => "cursor",
            Self::Leave { .. } => "leave",
        }
    }
}
