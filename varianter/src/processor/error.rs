//! Processing outcomes and errors.

use thiserror::Error;

use crate::store::StoreError;
use crate::task::{TaskId, TaskStatus};

/// Errors that escape task processing.
///
/// Generation failures are never reported here: they become the task's
/// `Failed` state. Only a missing task or a failed terminal write surfaces.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The task id does not exist in the store.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// The store rejected a read or the terminal write. The task stays
    /// pending and is picked up again by recovery.
    #[error("store error while processing task {id}: {source}")]
    Store {
        id: TaskId,
        #[source]
        source: StoreError,
    },
}

/// What happened to a task during one processing run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Variants were generated and recorded.
    Completed { variants: usize },
    /// Generation or image persistence failed; the message was recorded.
    Failed { error: String },
    /// The task was already terminal before this run started.
    AlreadyTerminal(TaskStatus),
    /// Another run reached the terminal write first.
    Superseded(TaskStatus),
}

impl TaskOutcome {
    /// Status the task has after this run.
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Completed { .. } => TaskStatus::Completed,
            Self::Failed { .. } => TaskStatus::Failed,
            Self::AlreadyTerminal(status) | Self::Superseded(status) => *status,
        }
    }
}
