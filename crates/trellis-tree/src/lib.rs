//! Materialized-path hierarchical tree store.
//!
//! Every item in a container occupies at most one [`TreeNode`]. A node's
//! position is encoded twice: structurally (`parent_id`, `order`) and as a
//! [`NodePath`] — a dot-separated string of 1-based ordinal segments
//! (`"1.2.1"`). The path makes subtree selection a prefix match, which is
//! what lets a whole subtree relocate across containers in one pass.
//!
//! # Key Types
//!
//! - [`NodePath`] — materialized path with parse/format/prefix/reroot
//! - [`TreeNode`] — one position in a container's hierarchy
//! - [`TreeStore`] — the storage trait
//! - [`InMemoryTreeStore`] — `RwLock`-backed reference implementation

pub mod error;
pub mod memory;
pub mod node;
pub mod path;
pub mod traits;

pub use error::{TreeError, TreeResult};
pub use memory::InMemoryTreeStore;
pub use node::{MoveOutcome, TreeNode};
pub use path::NodePath;
pub use traits::TreeStore;
