use thiserror::Error;
use trellis_types::{ActorId, ContainerId, GroupId, ItemId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpsError {
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("group {group} not found in container {container}")]
    GroupNotFound {
        group: GroupId,
        container: ContainerId,
    },

    #[error("actor {actor} may not {action}")]
    PermissionDenied { actor: ActorId, action: String },

    #[error("item {0} is already in the target container")]
    SameContainer(ItemId),

    #[error("item {0} is already in the target group")]
    GroupUnchanged(ItemId),

    #[error("tree error: {0}")]
    Tree(#[from] trellis_tree::TreeError),

    #[error("version error: {0}")]
    Version(#[from] trellis_versions::VersionError),

    #[error("directory error: {0}")]
    Directory(String),
}

pub type OpsResult<T> = Result<T, OpsError>;
