use thiserror::Error;
use trellis_types::{ContainerId, ItemId, NodeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("no tree node for item {0}")]
    ItemNotFound(ItemId),

    #[error("item {0} already has a tree node")]
    NodeAlreadyExists(ItemId),

    #[error("item {0} is already in container {1}")]
    AlreadyInContainer(ItemId, ContainerId),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("transaction aborted: {0}")]
    TransactionFailure(String),
}

pub type TreeResult<T> = Result<T, TreeError>;
