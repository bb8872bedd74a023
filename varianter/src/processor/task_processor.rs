//! Per-task lifecycle driver.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::error::{ProcessError, TaskOutcome};
use super::job::ProcessTaskJob;
use crate::executor::{BoxFuture, JobError, JobHandler};
use crate::store::{Store, StoreError};
use crate::task::{ImageRecord, TaskId, TerminalUpdate, VariantReference, TARGET_WIDTHS};
use crate::variant::{GenerateOptions, VariantErrorKind, VariantGenerator};

/// Drives one task from `Pending` to a terminal state.
///
/// Each run performs at most one terminal write. Generation and image
/// persistence failures are recorded on the task instead of being returned.
pub struct TaskProcessor {
    store: Arc<dyn Store>,
    generator: Arc<VariantGenerator>,
    options: GenerateOptions,
    widths: Vec<u32>,
}

impl TaskProcessor {
    /// Creates a processor generating the standard target widths.
    pub fn new(
        store: Arc<dyn Store>,
        generator: Arc<VariantGenerator>,
        options: GenerateOptions,
    ) -> Self {
        Self {
            store,
            generator,
            options,
            widths: TARGET_WIDTHS.to_vec(),
        }
    }

    /// Overrides the target widths.
    pub fn with_widths(mut self, widths: Vec<u32>) -> Self {
        self.widths = widths;
        self
    }

    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    /// Processes `task_id`, reading the image from `source`.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::TaskNotFound`] when the task does not exist
    /// - [`ProcessError::Store`] when loading the task or the terminal write
    ///   fails; the task is left pending
    pub async fn process_task(
        &self,
        task_id: TaskId,
        source: &str,
    ) -> Result<TaskOutcome, ProcessError> {
        let task = self
            .store
            .get_task(task_id)
            .await
            .map_err(|e| ProcessError::Store {
                id: task_id,
                source: e,
            })?
            .ok_or(ProcessError::TaskNotFound(task_id))?;

        if task.status.is_terminal() {
            debug!(task_id = %task_id, status = %task.status, "Task already terminal, skipping");
            return Ok(TaskOutcome::AlreadyTerminal(task.status));
        }

        let started = Instant::now();
        let update = self.build_update(task_id, source).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match self.store.set_task_terminal(task_id, update).await {
            Ok(task) => {
                let outcome = match task.error {
                    Some(error) => TaskOutcome::Failed { error },
                    None => TaskOutcome::Completed {
                        variants: task.variants.len(),
                    },
                };
                info!(
                    task_id = %task_id,
                    status = %task.status,
                    duration_ms = duration_ms,
                    "Task processed"
                );
                Ok(outcome)
            }
            Err(StoreError::AlreadyTerminal { status, .. }) => {
                info!(
                    task_id = %task_id,
                    status = %status,
                    "Task finished by a concurrent run"
                );
                Ok(TaskOutcome::Superseded(status))
            }
            Err(StoreError::NotFound(id)) => Err(ProcessError::TaskNotFound(id)),
            Err(e) => Err(ProcessError::Store {
                id: task_id,
                source: e,
            }),
        }
    }

    /// Runs generation and image persistence, folding any failure into a
    /// `Failed` update.
    async fn build_update(&self, task_id: TaskId, source: &str) -> TerminalUpdate {
        let variants = match self
            .generator
            .generate(source, &self.widths, &self.options)
            .await
        {
            Ok(variants) => variants,
            Err(e) => {
                match e.kind() {
                    VariantErrorKind::SourceUnavailable => {
                        warn!(task_id = %task_id, source = source, error = %e, "Source unavailable")
                    }
                    _ => {
                        error!(task_id = %task_id, source = source, error = %e, "Variant generation failed")
                    }
                }
                return TerminalUpdate::Failed {
                    error: e.to_string(),
                };
            }
        };

        let references: Vec<VariantReference> =
            variants.iter().map(|variant| variant.to_reference()).collect();
        let records = references
            .iter()
            .map(|reference| ImageRecord::for_variant(task_id, reference))
            .collect();

        if let Err(e) = self.store.insert_image_records(task_id, records).await {
            error!(task_id = %task_id, error = %e, "Failed to persist image records");
            return TerminalUpdate::Failed {
                error: format!("failed to persist image records: {}", e),
            };
        }

        TerminalUpdate::Completed {
            variants: references,
        }
    }
}

impl JobHandler<ProcessTaskJob> for TaskProcessor {
    fn handle(&self, job: ProcessTaskJob) -> BoxFuture<'_, Result<(), JobError>> {
        Box::pin(async move {
            self.process_task(job.task_id, &job.source)
                .await
                .map(|_| ())
                .map_err(JobError::from_error)
        })
    }
}
