//! Foundation types for Trellis.
//!
//! This crate provides the identifier and principal types used throughout
//! the Trellis system. Every other Trellis crate depends on `trellis-types`.
//!
//! # Key Types
//!
//! - [`ContainerId`] — Tenant scope (workspace) that owns items and tree nodes
//! - [`ItemId`] — A content document; has at most one tree node
//! - [`NodeId`] — A position in a container's hierarchy
//! - [`GroupId`] — Logical grouping attribute (project membership)
//! - [`ActorId`] / [`Actor`] — An authenticated principal performing mutations
//! - [`SenderId`] — Ephemeral per-session identity for the real-time relay

pub mod actor;
pub mod error;
pub mod id;

pub use actor::{Actor, ActorId};
pub use error::TypeError;
pub use id::{ContainerId, GroupId, ItemId, NodeId, SenderId, VersionId};
