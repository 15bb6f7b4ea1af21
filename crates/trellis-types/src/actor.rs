use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

pub use crate::id::ActorId;

/// An authenticated principal performing a mutation.
///
/// Trellis never issues sessions or computes roles itself; an `Actor` is
/// handed in by the caller and checked against the permission resolver
/// before any write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub display_name: String,
}

impl Actor {
    /// Create an actor, rejecting an empty display name.
    pub fn new(id: ActorId, display_name: impl Into<String>) -> Result<Self, TypeError> {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(TypeError::EmptyDisplayName);
        }
        Ok(Self { id, display_name })
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id.short_id())
    }
}
