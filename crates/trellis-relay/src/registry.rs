use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;
use trellis_protocol::RelayMessage;
use trellis_types::{ItemId, SenderId};

/// One live connection joined to an item.
///
/// Ephemeral: exists only while the socket is open. The `sender_id` is
/// generated client-side once per session (tab lifetime) and is the key
/// used for self-echo suppression.
pub struct RelaySession {
    sender_id: SenderId,
    outbound: mpsc::UnboundedSender<RelayMessage>,
}

impl RelaySession {
    /// Create a session and the receiving end of its outbound queue.
    pub fn new(sender_id: SenderId) -> (Self, mpsc::UnboundedReceiver<RelayMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                sender_id,
                outbound: tx,
            },
            rx,
        )
    }

    /// Create a session that queues onto an existing channel. Used by the
    /// server, where one connection's writer serves every room the
    /// connection joins.
    pub fn with_outbound(sender_id: SenderId, outbound: mpsc::UnboundedSender<RelayMessage>) -> Self {
        Self {
            sender_id,
            outbound,
        }
    }

    pub fn sender_id(&self) -> SenderId {
        self.sender_id
    }

    /// Queue a message for delivery. Returns `false` if the session's
    /// receiver is gone (connection closed).
    fn send(&self, msg: RelayMessage) -> bool {
        self.outbound.send(msg).is_ok()
    }
}

/// Process-wide fan-out registry: `item → live sessions`.
///
/// Entries are created lazily on first join and reclaimed as soon as the
/// last session leaves, which bounds memory to the set of items actually
/// being co-edited. Sessions whose connection vanished without a clean
/// leave are pruned during broadcast.
pub struct RelayRegistry {
    rooms: RwLock<HashMap<ItemId, Vec<RelaySession>>>,
}

impl RelayRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session's interest in an item.
    ///
    /// A session re-joining the same item (e.g. after reconnect with the
    /// same sender id) replaces its previous registration.
    pub fn join(&self, item: ItemId, session: RelaySession) {
        let mut rooms = self.rooms.write().expect("lock poisoned");
        let sessions = rooms.entry(item).or_default();
        sessions.retain(|s| s.sender_id != session.sender_id);
        sessions.push(session);
        tracing::debug!(%item, sessions = sessions.len(), "session joined");
    }

    /// Remove a session. Deletes the item's entry when it empties.
    /// Returns `true` if the session was present.
    pub fn leave(&self, item: ItemId, sender: SenderId) -> bool {
        let mut rooms = self.rooms.write().expect("lock poisoned");
        let Some(sessions) = rooms.get_mut(&item) else {
            return false;
        };
        let before = sessions.len();
        sessions.retain(|s| s.sender_id != sender);
        let removed = sessions.len() < before;
        if sessions.is_empty() {
            rooms.remove(&item);
        }
        removed
    }

    /// Forward `msg` to every session joined to `item` except the sender
    /// itself. Returns the number of sessions the message was queued for.
    pub fn broadcast(&self, item: ItemId, sender: SenderId, msg: &RelayMessage) -> usize {
        let mut rooms = self.rooms.write().expect("lock poisoned");
        let Some(sessions) = rooms.get_mut(&item) else {
            return 0;
        };
        let mut delivered = 0;
        sessions.retain(|session| {
            if session.sender_id == sender {
                return true;
            }
            if session.send(msg.clone()) {
                delivered += 1;
                true
            } else {
                // Receiver dropped without a leave; prune in passing.
                false
            }
        });
        if sessions.is_empty() {
            rooms.remove(&item);
        }
        delivered
    }

    /// Live sessions currently joined to an item.
    pub fn session_count(&self, item: ItemId) -> usize {
        self.rooms
            .read()
            .expect("lock poisoned")
            .get(&item)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Items with at least one live session.
    pub fn item_count(&self) -> usize {
        self.rooms.read().expect("lock poisoned").len()
    }
}

impl Default for RelayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RelayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayRegistry")
            .field("item_count", &self.item_count())
            .finish()
    }
}
