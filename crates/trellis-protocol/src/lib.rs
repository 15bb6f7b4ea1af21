//! Wire protocol for the Trellis real-time relay.
//!
//! Messages are JSON objects tagged by a `"type"` field, framed one per
//! line over a persistent bidirectional socket. The relay is a pure
//! transport: a `content` frame carries the whole document and the
//! receiver replaces its local state wholesale (last-write-wins, no
//! merge).

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{LineCodec, MAX_FRAME_SIZE};
pub use error::{ProtocolError, ProtocolResult};
pub use message::RelayMessage;
