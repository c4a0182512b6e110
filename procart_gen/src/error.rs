// Error type for every fallible procart operation.
//
// Precondition violations (bad grid sizes, degenerate amplitudes, empty
// branch-count ranges) surface as `InvalidArgument` instead of being clamped.
// Tree bookkeeping errors (unknown node, unknown handle, attempted root
// prune) are distinct variants so the studio can report them precisely.
// `MissingTemplate` is a startup-time configuration failure: a `BranchTree`
// refuses to be built against a host that can't spawn both visual kinds.

use crate::types::{NodeId, VisualHandle, VisualKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} is not in the tree registry")]
    UnknownNode(NodeId),

    #[error("{0} does not belong to any tree node")]
    UnknownHandle(VisualHandle),

    #[error("the root node cannot be pruned")]
    RootPrune,

    #[error("visual host has no {0} template")]
    MissingTemplate(VisualKind),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GenError::InvalidArgument(msg.into())
    }
}

pub type GenResult<T> = Result<T, GenError>;
