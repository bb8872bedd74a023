//! Task and image records as persisted by the stores.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Price, TaskId, TaskStatus};

/// Message recorded when a failure carries no text of its own.
const FALLBACK_ERROR_MESSAGE: &str = "processing failed";

/// Reference to one generated variant, embedded in a completed task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantReference {
    /// Target width this variant was generated for.
    pub width: u32,
    /// Location of the encoded output.
    pub path: PathBuf,
    /// SHA-256 of the output bytes (lowercase hex).
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Standalone image record, queryable by task.
///
/// Carries the same data as [`VariantReference`] plus the owning task id.
/// Stores key image records by `(task_id, width)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub task_id: TaskId,
    pub width: u32,
    pub path: PathBuf,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Builds the record for a variant belonging to `task_id`.
    pub fn for_variant(task_id: TaskId, variant: &VariantReference) -> Self {
        Self {
            task_id,
            width: variant.width,
            path: variant.path.clone(),
            content_hash: variant.content_hash.clone(),
            created_at: variant.created_at,
        }
    }
}

/// Minimal projection of a pending task, as needed by recovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTask {
    pub id: TaskId,
    pub source: String,
}

/// The single write that moves a task out of `Pending`.
#[derive(Clone, Debug, PartialEq)]
pub enum TerminalUpdate {
    /// Processing produced the full variant set.
    Completed { variants: Vec<VariantReference> },
    /// Processing failed with the given message.
    Failed { error: String },
}

impl TerminalUpdate {
    /// Status the task will have after this update.
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Completed { .. } => TaskStatus::Completed,
            Self::Failed { .. } => TaskStatus::Failed,
        }
    }
}

/// Reasons a terminal update cannot be applied to a task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The task already left `Pending`.
    #[error("task is already {0}")]
    AlreadyTerminal(TaskStatus),

    /// A completed task needs at least one variant.
    #[error("completed task must carry at least one variant")]
    EmptyVariants,

    /// Two variants share a width.
    #[error("duplicate variant width {0}")]
    DuplicateWidth(u32),
}

/// A unit of user-requested work producing image variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    pub price: Price,
    /// Local path or remote URL of the input image.
    pub source: String,
    #[serde(default)]
    pub variants: Vec<VariantReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new pending task.
    pub fn new(price: Price, source: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            status: TaskStatus::Pending,
            price,
            source: source.into(),
            variants: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a terminal update in place.
    ///
    /// Leaves the task untouched when the transition is rejected.
    pub fn apply_terminal(&mut self, update: TerminalUpdate) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::AlreadyTerminal(self.status));
        }

        match update {
            TerminalUpdate::Completed { variants } => {
                if variants.is_empty() {
                    return Err(TransitionError::EmptyVariants);
                }
                let mut seen = HashSet::with_capacity(variants.len());
                for variant in &variants {
                    if !seen.insert(variant.width) {
                        return Err(TransitionError::DuplicateWidth(variant.width));
                    }
                }
                self.status = TaskStatus::Completed;
                self.variants = variants;
                self.error = None;
            }
            TerminalUpdate::Failed { error } => {
                let error = if error.trim().is_empty() {
                    FALLBACK_ERROR_MESSAGE.to_string()
                } else {
                    error
                };
                self.status = TaskStatus::Failed;
                self.variants.clear();
                self.error = Some(error);
            }
        }

        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(width: u32) -> VariantReference {
        VariantReference {
            width,
            path: PathBuf::from(format!("output/img/{width}/abc.jpg")),
            content_hash: "abc".to_string(),
            created_at: Utc::now(),
        }
    }

    fn pending_task() -> Task {
        Task::new(Price::new(10.0).unwrap(), "/tmp/img.jpg")
    }

    #[test]
    fn test_new_task_is_pending_without_variants() {
        let task = pending_task();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.variants.is_empty());
        assert!(task.error.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_complete_attaches_variants() {
        let mut task = pending_task();
        task.apply_terminal(TerminalUpdate::Completed {
            variants: vec![variant(1024), variant(800)],
        })
        .unwrap();

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.variants.len(), 2);
        assert!(task.error.is_none());
        assert!(task.updated_at >= task.created_at);
    }

    #[test]
    fn test_fail_records_message() {
        let mut task = pending_task();
        task.apply_terminal(TerminalUpdate::Failed {
            error: "source missing".to_string(),
        })
        .unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("source missing"));
        assert!(task.variants.is_empty());
    }

    #[test]
    fn test_fail_with_blank_message_uses_fallback() {
        let mut task = pending_task();
        task.apply_terminal(TerminalUpdate::Failed {
            error: "  ".to_string(),
        })
        .unwrap();
        assert_eq!(task.error.as_deref(), Some(FALLBACK_ERROR_MESSAGE));
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut task = pending_task();
        task.apply_terminal(TerminalUpdate::Failed {
            error: "boom".to_string(),
        })
        .unwrap();

        let err = task
            .apply_terminal(TerminalUpdate::Completed {
                variants: vec![variant(800)],
            })
            .unwrap_err();

        assert_eq!(err, TransitionError::AlreadyTerminal(TaskStatus::Failed));
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.variants.is_empty());
    }

    #[test]
    fn test_completion_rejects_empty_or_duplicate_variants() {
        let mut task = pending_task();
        assert_eq!(
            task.apply_terminal(TerminalUpdate::Completed { variants: vec![] }),
            Err(TransitionError::EmptyVariants)
        );
        assert_eq!(
            task.apply_terminal(TerminalUpdate::Completed {
                variants: vec![variant(800), variant(800)],
            }),
            Err(TransitionError::DuplicateWidth(800))
        );
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_task_json_omits_absent_error() {
        let task = pending_task();
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["status"], "pending");
    }
}
