use thiserror::Error;
use trellis_types::ItemId;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("item {item} already has {max} live sessions")]
    RoomFull { item: ItemId, max: usize },

    #[error("protocol error: {0}")]
    Protocol(#[from] trellis_protocol::ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RelayResult<T> = Result<T, RelayError>;
