//! Atomic document operations: move, duplicate, reparent, and the owning
//! content-update path.
//!
//! This crate composes the tree store and the version log into the
//! user-facing mutations. Every mutation validates permissions and
//! structure first and only then writes, so a typed failure never leaves
//! partial state behind. Cross-container subtree moves are additionally
//! serialized per target container, which keeps sibling-order assignment
//! in the destination race-free.
//!
//! External collaborators (permissions, the item directory, the content
//! renderer) are consumed through traits; in-memory implementations for
//! tests and embedding live in [`directory`].

pub mod collab;
pub mod content;
pub mod directory;
pub mod error;
pub mod manager;

pub use collab::{ContentRenderer, ItemDirectory, ItemRecord, PermissionResolver};
pub use content::ContentService;
pub use directory::{InMemoryItemDirectory, PlainTextRenderer, StaticPermissions};
pub use error::{OpsError, OpsResult};
pub use manager::MoveManager;
