use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use trellis_protocol::RelayMessage;
use trellis_types::{ItemId, SenderId};

use crate::error::SyncResult;
use crate::transport::{RelayConnection, RelayTransport};

/// How long a pending save sits before it is flushed. Every further local
/// edit restarts the window.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Fixed delay between a lost connection and the next dial attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub save_debounce: Duration,
    pub reconnect_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            save_debounce: SAVE_DEBOUNCE,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// Connectivity indicator surfaced to the editing session. Socket trouble
/// never reaches the session as an error; only this state changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

/// Durable persistence seam: the owning item-update path, which persists
/// content and appends an `updated` version entry.
#[async_trait]
pub trait ItemSaver: Send + Sync {
    async fn save(&self, item: ItemId, content: serde_json::Value) -> SyncResult<()>;
}

enum Command {
    LocalEdit(serde_json::Value),
    Shutdown,
}

struct Shared {
    content: serde_json::Value,
    connectivity: Connectivity,
    suppress_next_local: bool,
    last_saved: Option<serde_json::Value>,
}

/// Bridges one editing session to the relay and the durable save path.
///
/// `sender_id` is generated once at spawn and kept for the adapter's
/// lifetime. Local edits broadcast unthrottled; saves are debounced and
/// skipped entirely when nothing changed since the last durable write.
pub struct SyncAdapter {
    item: ItemId,
    sender_id: SenderId,
    shared: Arc<Mutex<Shared>>,
    commands: mpsc::UnboundedSender<Command>,
    driver: tokio::task::JoinHandle<()>,
}

impl SyncAdapter {
    /// Spawn the adapter's driver task and dial the relay.
    pub fn spawn(
        item: ItemId,
        initial_content: serde_json::Value,
        transport: Arc<dyn RelayTransport>,
        saver: Arc<dyn ItemSaver>,
        config: SyncConfig,
    ) -> Self {
        let sender_id = SenderId::new();
        let shared = Arc::new(Mutex::new(Shared {
            content: initial_content,
            connectivity: Connectivity::Connecting,
            suppress_next_local: false,
            last_saved: None,
        }));
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(
            item,
            sender_id,
            Arc::clone(&shared),
            commands_rx,
            transport,
            saver,
            config,
        ));
        Self {
            item,
            sender_id,
            shared,
            commands,
            driver,
        }
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    /// The ephemeral identity this session broadcasts under.
    pub fn sender_id(&self) -> SenderId {
        self.sender_id
    }

    /// Feed a local editor change event.
    ///
    /// If the change was caused by a remote frame the adapter itself just
    /// applied, the one-shot suppression flag swallows it here — no
    /// re-broadcast, no version bump.
    pub fn local_edit(&self, content: serde_json::Value) {
        {
            let mut shared = self.shared.lock().expect("lock poisoned");
            if shared.suppress_next_local {
                shared.suppress_next_local = false;
                return;
            }
            shared.content = content.clone();
        }
        let _ = self.commands.send(Command::LocalEdit(content));
    }

    /// The session's current document state.
    pub fn content(&self) -> serde_json::Value {
        self.shared.lock().expect("lock poisoned").content.clone()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.shared.lock().expect("lock poisoned").connectivity
    }

    /// Leave the relay and stop the driver. A pending unsaved edit is
    /// flushed before shutdown completes.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        let _ = self.driver.await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn drive(
    item: ItemId,
    sender_id: SenderId,
    shared: Arc<Mutex<Shared>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    transport: Arc<dyn RelayTransport>,
    saver: Arc<dyn ItemSaver>,
    config: SyncConfig,
) {
    let mut pending_save: Option<serde_json::Value> = None;
    let mut save_deadline: Option<Instant> = None;
    let mut first_attempt = true;

    loop {
        if !first_attempt {
            set_connectivity(&shared, Connectivity::Reconnecting);
            tokio::time::sleep(config.reconnect_delay).await;
        }
        first_attempt = false;

        // Persistence does not wait for connectivity.
        flush_if_due(item, &shared, &saver, &mut pending_save, &mut save_deadline).await;

        let mut conn = match transport.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(%item, error = %e, "relay dial failed");
                continue;
            }
        };
        if conn
            .send(RelayMessage::Join {
                item_id: item,
                sender_id,
            })
            .await
            .is_err()
        {
            continue;
        }
        set_connectivity(&shared, Connectivity::Connected);
        tracing::debug!(%item, sender = %sender_id, "joined relay");

        let reconnect = session_loop(
            item,
            sender_id,
            &shared,
            &mut commands,
            conn.as_mut(),
            &saver,
            &config,
            &mut pending_save,
            &mut save_deadline,
        )
        .await;
        if !reconnect {
            // Clean shutdown: flush whatever is still pending.
            save_deadline = None;
            flush_pending(item, &shared, &saver, &mut pending_save).await;
            set_connectivity(&shared, Connectivity::Closed);
            return;
        }
        tracing::warn!(%item, "relay connection lost; scheduling reconnect");
    }
}

/// Runs one connected session. Returns `true` to reconnect, `false` on
/// shutdown.
#[allow(clippy::too_many_arguments)]
async fn session_loop(
    item: ItemId,
    sender_id: SenderId,
    shared: &Arc<Mutex<Shared>>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    conn: &mut dyn RelayConnection,
    saver: &Arc<dyn ItemSaver>,
    config: &SyncConfig,
    pending_save: &mut Option<serde_json::Value>,
    save_deadline: &mut Option<Instant>,
) -> bool {
    loop {
        let deadline = save_deadline.unwrap_or_else(Instant::now);
        tokio::select! {
            cmd = commands.recv() => match cmd {
                None | Some(Command::Shutdown) => {
                    let _ = conn
                        .send(RelayMessage::Leave { item_id: item, sender_id })
                        .await;
                    return false;
                }
                Some(Command::LocalEdit(content)) => {
                    // Unthrottled broadcast; the save is scheduled
                    // independently.
                    *pending_save = Some(content.clone());
                    *save_deadline = Some(Instant::now() + config.save_debounce);
                    let frame = RelayMessage::Content {
                        item_id: item,
                        sender_id,
                        content,
                    };
                    if conn.send(frame).await.is_err() {
                        return true;
                    }
                }
            },
            frame = conn.recv() => match frame {
                Ok(Some(RelayMessage::Content { item_id, sender_id: from, content })) => {
                    if item_id == item && from != sender_id {
                        let mut state = shared.lock().expect("lock poisoned");
                        // Last write wins: replace wholesale, and arm the
                        // one-shot flag so the editor's change event is
                        // not re-broadcast.
                        state.content = content;
                        state.suppress_next_local = true;
                    }
                }
                // Presence and membership frames carry no document state.
                Ok(Some(_)) => {}
                Ok(None) => return true,
                Err(e) => {
                    tracing::warn!(%item, error = %e, "relay receive failed");
                    return true;
                }
            },
            _ = tokio::time::sleep_until(deadline), if save_deadline.is_some() => {
                *save_deadline = None;
                flush_pending(item, shared, saver, pending_save).await;
            }
        }
    }
}

fn set_connectivity(shared: &Arc<Mutex<Shared>>, connectivity: Connectivity) {
    shared.lock().expect("lock poisoned").connectivity = connectivity;
}

async fn flush_if_due(
    item: ItemId,
    shared: &Arc<Mutex<Shared>>,
    saver: &Arc<dyn ItemSaver>,
    pending_save: &mut Option<serde_json::Value>,
    save_deadline: &mut Option<Instant>,
) {
    if save_deadline.is_some_and(|d| Instant::now() >= d) {
        *save_deadline = None;
        flush_pending(item, shared, saver, pending_save).await;
    }
}

/// Persist the pending content if it differs from the last durable save.
/// A failed save is logged and dropped: the next debounce settles with
/// fresher content anyway, and the last save to complete wins.
async fn flush_pending(
    item: ItemId,
    shared: &Arc<Mutex<Shared>>,
    saver: &Arc<dyn ItemSaver>,
    pending_save: &mut Option<serde_json::Value>,
) {
    let Some(content) = pending_save.take() else {
        return;
    };
    let unchanged = {
        let state = shared.lock().expect("lock poisoned");
        state.last_saved.as_ref() == Some(&content)
    };
    if unchanged {
        return;
    }
    match saver.save(item, content.clone()).await {
        Ok(()) => {
            shared.lock().expect("lock poisoned").last_saved = Some(content);
        }
        Err(e) => {
            tracing::warn!(%item, error = %e, "debounced save failed");
        }
    }
}
