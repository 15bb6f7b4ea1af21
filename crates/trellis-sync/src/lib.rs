//! Per-session client sync adapter.
//!
//! The adapter sits between a local editor and the rest of the system.
//! Every local edit goes two independent ways:
//!
//! - immediately to the relay as a `content` frame, so live peers see it
//!   with no added latency;
//! - into a debounced pending-save slot; when the debounce window settles
//!   and the pending content differs from the last durably saved content,
//!   one save lands on the owning item-update path (which also appends a
//!   version entry).
//!
//! Remote `content` frames are applied wholesale (last-write-wins) with a
//! one-shot suppression flag, so the editor's resulting change
//! notification is not mistaken for a user edit and re-broadcast.

pub mod adapter;
pub mod error;
pub mod transport;

pub use adapter::{Connectivity, ItemSaver, SyncAdapter, SyncConfig, RECONNECT_DELAY, SAVE_DEBOUNCE};
pub use error::{SyncError, SyncResult};
pub use transport::{ChannelPeer, ChannelTransport, RelayConnection, RelayTransport, TcpTransport};
