use crate::error::{ProtocolError, ProtocolResult};
use crate::message::RelayMessage;

/// Upper bound on one frame. A frame carries at most one full document
/// snapshot.
pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Codec for the relay's newline-delimited JSON framing.
///
/// One frame per line: JSON never contains a raw newline (it is escaped
/// inside strings), so `'\n'` is an unambiguous frame boundary.
pub struct LineCodec;

impl LineCodec {
    /// Encode a message as one frame, trailing newline included.
    pub fn encode(msg: &RelayMessage) -> ProtocolResult<String> {
        let mut line = serde_json::to_string(msg)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if line.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: line.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        line.push('\n');
        Ok(line)
    }

    /// Decode one frame. The input may carry its line terminator.
    pub fn decode_line(line: &str) -> ProtocolResult<RelayMessage> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        if trimmed.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: trimmed.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        serde_json::from_str(trimmed).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}
