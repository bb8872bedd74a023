//! The queue job for processing one task.

use std::fmt;

use crate::task::{PendingTask, TaskId};

/// Process the task `task_id` from `source`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessTaskJob {
    pub task_id: TaskId,
    pub source: String,
}

impl ProcessTaskJob {
    pub fn new(task_id: TaskId, source: impl Into<String>) -> Self {
        Self {
            task_id,
            source: source.into(),
        }
    }
}

impl From<PendingTask> for ProcessTaskJob {
    fn from(task: PendingTask) -> Self {
        Self::new(task.id, task.source)
    }
}

impl fmt::Display for ProcessTaskJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "process task {} ({})", self.task_id, self.source)
    }
}
