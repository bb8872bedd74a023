//! Store contract for task and image records.
//!
//! The traits are the only view the processing core has of persistence.
//! They are dyn-compatible (`Arc<dyn TaskStore>`) and use boxed futures so
//! any backend can be injected.
//!
//! # Atomicity
//!
//! - `set_task_terminal` is a single conditional write: it succeeds only
//!   while the task is `Pending`, which keeps terminal states sticky even
//!   when two runs race on the same task.
//! - `insert_image_records` replaces any record with the same
//!   `(task_id, width)`, so re-running a task never duplicates images.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::task::{
    ImageRecord, PendingTask, Price, Task, TaskId, TaskStatus, TerminalUpdate, TransitionError,
};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No task with this id exists.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The task already reached a terminal state.
    #[error("task {id} is already {status}")]
    AlreadyTerminal { id: TaskId, status: TaskStatus },

    /// The update violates a task invariant.
    #[error("invalid update for task {id}: {reason}")]
    InvalidUpdate { id: TaskId, reason: TransitionError },

    /// An image record points at a task the store does not know.
    #[error("image records reference unknown task {0}")]
    UnknownTask(TaskId),

    /// I/O error in a persistent backend.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Maps a rejected transition on task `id` to a store error.
    pub(crate) fn from_transition(id: TaskId, err: TransitionError) -> Self {
        match err {
            TransitionError::AlreadyTerminal(status) => Self::AlreadyTerminal { id, status },
            reason => Self::InvalidUpdate { id, reason },
        }
    }
}

/// Durable task records.
pub trait TaskStore: Send + Sync {
    /// Creates a pending task and returns it.
    fn create_task(&self, price: Price, source: String) -> BoxFuture<'_, StoreResult<Task>>;

    /// Loads a task, `None` when absent.
    fn get_task(&self, id: TaskId) -> BoxFuture<'_, StoreResult<Option<Task>>>;

    /// Moves a pending task to a terminal state in one write.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] for an unknown id
    /// - [`StoreError::AlreadyTerminal`] when the task left `Pending` already
    /// - [`StoreError::InvalidUpdate`] when the update breaks an invariant
    fn set_task_terminal(
        &self,
        id: TaskId,
        update: TerminalUpdate,
    ) -> BoxFuture<'_, StoreResult<Task>>;

    /// Lists every task still `Pending`, oldest first.
    fn find_pending_tasks(&self) -> BoxFuture<'_, StoreResult<Vec<PendingTask>>>;
}

/// Durable image records, queryable by task.
pub trait ImageStore: Send + Sync {
    /// Upserts image records for `task_id`, keyed by width.
    fn insert_image_records(
        &self,
        task_id: TaskId,
        records: Vec<ImageRecord>,
    ) -> BoxFuture<'_, StoreResult<()>>;

    /// Returns the image records of a task sorted by width.
    fn images_for_task(&self, task_id: TaskId) -> BoxFuture<'_, StoreResult<Vec<ImageRecord>>>;
}
