//! Task service errors.

use thiserror::Error;

use crate::store::StoreError;
use crate::task::TaskId;

/// Errors returned to callers of the task service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request is malformed (empty source, unparseable id).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No task with this id exists.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
