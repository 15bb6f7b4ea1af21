use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new time-ordered identifier (UUID v7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Create from an existing UUID.
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Short representation (first 8 characters of the UUID).
            pub fn short_id(&self) -> String {
                self.0.to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| TypeError::InvalidId(e.to_string()))
            }
        }
    };
}

define_id! {
    /// Identifier for a container: the top-level tenant scope (workspace)
    /// that owns items and tree nodes.
    ContainerId
}

define_id! {
    /// Identifier for an item (a content document). An item has at most one
    /// tree node across its whole lifetime.
    ItemId
}

define_id! {
    /// Identifier for a tree node: one position in a container's hierarchy.
    NodeId
}

define_id! {
    /// Identifier for a logical group (e.g. project membership) within a
    /// container. Independent of the path hierarchy.
    GroupId
}

define_id! {
    /// Identifier for a single entry in an item's version log.
    VersionId
}

define_id! {
    /// Identifier for an authenticated principal.
    ActorId
}

define_id! {
    /// Ephemeral identity for one connected real-time session. Generated
    /// once per session and valid only for its lifetime; never persisted.
    SenderId
}
