use thiserror::Error;
use trellis_types::ItemId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("no version {sequence} for item {item}")]
    VersionNotFound { item: ItemId, sequence: u64 },

    #[error("item {0} has no version history")]
    EmptyHistory(ItemId),
}

pub type VersionResult<T> = Result<T, VersionError>;
