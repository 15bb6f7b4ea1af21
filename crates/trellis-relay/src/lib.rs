//! In-process real-time relay.
//!
//! The relay fans live edit frames out between sessions viewing the same
//! item. It is pure transport: nothing is persisted, delivery order is
//! whatever each connection observes, and concurrent broadcasts from
//! different senders are delivered independently — receivers overwrite
//! their local state with the most recent frame (last-write-wins).
//!
//! The registry is an explicit, injectable object rather than process
//! globals: each server instance owns one, and a deployment that needs
//! horizontal fan-out can put an external bus behind the same surface.
//! Collaborators connected to different server instances do not see each
//! other's edits.

pub mod config;
pub mod error;
pub mod registry;
pub mod server;

pub use config::ServerConfig;
pub use error::{RelayError, RelayResult};
pub use registry::{RelayRegistry, RelaySession};
pub use server::RelayServer;
