//! Append-only version log.
//!
//! Every content mutation of an item appends one [`VersionEntry`] with a
//! per-item monotonic sequence number. History is never rewritten: a
//! restore copies an old snapshot forward as a brand-new entry, so the log
//! only ever grows.

pub mod entry;
pub mod error;
pub mod memory;
pub mod traits;

pub use entry::{AnnotatedVersion, VersionEntry, VersionEvent};
pub use error::{VersionError, VersionResult};
pub use memory::InMemoryVersionLog;
pub use traits::{UserDirectory, UserProfile, VersionLog};
