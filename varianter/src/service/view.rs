//! Response shapes returned to callers of the task service.

use serde::Serialize;

use crate::task::{ImageRecord, Price, TaskId, TaskStatus};

/// Result of a successful submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTask {
    #[serde(rename = "taskId")]
    pub id: TaskId,
    pub status: TaskStatus,
    pub price: Price,
}

/// One generated image as seen by a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantView {
    /// Target width as a string, e.g. `"1024"`.
    pub resolution: String,
    pub path: String,
    pub content_hash: String,
}

impl From<&ImageRecord> for VariantView {
    fn from(record: &ImageRecord) -> Self {
        Self {
            resolution: record.width.to_string(),
            path: record.path.display().to_string(),
            content_hash: record.content_hash.clone(),
        }
    }
}

/// Polling view of a task.
///
/// `variants` is present only for completed tasks and `error` only for
/// failed ones; absent fields are omitted when serialized.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(rename = "taskId")]
    pub id: TaskId,
    pub status: TaskStatus,
    pub price: Price,
    #[serde(rename = "images", skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<VariantView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
