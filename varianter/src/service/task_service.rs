//! Submission and polling surface.

use std::sync::Arc;

use tracing::{info, warn};

use super::error::ServiceError;
use super::view::{SubmittedTask, TaskView, VariantView};
use crate::executor::{BoundedWorkQueue, SubmitOutcome};
use crate::processor::ProcessTaskJob;
use crate::store::Store;
use crate::task::{Price, TaskId, TaskStatus};

/// Creates tasks, enqueues their processing, and answers status queries.
///
/// This is the layer an HTTP handler would call: it validates input,
/// assigns the price, and never waits for processing.
pub struct TaskService {
    store: Arc<dyn Store>,
    queue: BoundedWorkQueue<ProcessTaskJob>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>, queue: BoundedWorkQueue<ProcessTaskJob>) -> Self {
        Self { store, queue }
    }

    /// Creates a pending task for `source` and enqueues it.
    ///
    /// Returns as soon as the task is stored; the result is always
    /// `Pending`. If the queue is already closed the task simply stays
    /// pending until the next recovery pass.
    pub async fn submit_task(&self, source: &str) -> Result<SubmittedTask, ServiceError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(ServiceError::InvalidInput(
                "source must be a non-empty path or URL".to_string(),
            ));
        }

        let task = self
            .store
            .create_task(Price::random(), source.to_string())
            .await?;

        match self.queue.submit(ProcessTaskJob::new(task.id, task.source.clone())) {
            SubmitOutcome::Accepted => {
                info!(task_id = %task.id, price = %task.price, source = source, "Task submitted")
            }
            SubmitOutcome::Discarded => warn!(
                task_id = %task.id,
                "Queue closed, task left pending for recovery"
            ),
        }

        Ok(SubmittedTask {
            id: task.id,
            status: task.status,
            price: task.price,
        })
    }

    /// Looks up a task by its string id.
    pub async fn query_task(&self, id: &str) -> Result<TaskView, ServiceError> {
        self.query_task_id(parse_task_id(id)?).await
    }

    /// Looks up a task by id.
    pub async fn query_task_id(&self, id: TaskId) -> Result<TaskView, ServiceError> {
        view_task(self.store.as_ref(), id).await
    }

    pub fn queue(&self) -> &BoundedWorkQueue<ProcessTaskJob> {
        &self.queue
    }
}

/// Parses a client-supplied task id.
pub fn parse_task_id(id: &str) -> Result<TaskId, ServiceError> {
    id.trim()
        .parse()
        .map_err(|e| ServiceError::InvalidInput(format!("{}", e)))
}

/// Builds the polling view of task `id` straight from a store.
///
/// Variants are read from the image records and included only when the
/// task is completed.
pub async fn view_task(store: &dyn Store, id: TaskId) -> Result<TaskView, ServiceError> {
    let task = store.get_task(id).await?.ok_or(ServiceError::NotFound(id))?;

    let variants = match task.status {
        TaskStatus::Completed => {
            let records = store.images_for_task(id).await?;
            Some(records.iter().map(VariantView::from).collect())
        }
        _ => None,
    };

    Ok(TaskView {
        id: task.id,
        status: task.status,
        price: task.price,
        variants,
        error: task.error,
    })
}
