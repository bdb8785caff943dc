use std::io;

use shared::{networking::error::NetworkingError, source::SourceError};

use crate::progress::StoreError;

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("network error: {0}")]
    Networking(#[from] NetworkingError),

    /// Losing the checkpoint risks lost or duplicated work on restart, so this one is fatal.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] StoreError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),
}
