//! JSON-file store backend.
//!
//! Persists every task as its own JSON document so that work left pending by
//! a crashed or stopped process is found again on the next start.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── tasks/
//! │   └── <task-id>.json     Task document
//! └── images/
//!     └── <task-id>.json     Image records of the task, keyed by width
//! ```
//!
//! Documents are written to a sibling `.tmp` file and renamed into place, so
//! a reader never observes a half-written document. All writes go through a
//! single async lock, which makes the conditional terminal write atomic
//! within the process.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::traits::{BoxFuture, ImageStore, StoreError, StoreResult, TaskStore};
use crate::task::{ImageRecord, PendingTask, Price, Task, TaskId, TerminalUpdate};

const TASKS_DIR: &str = "tasks";
const IMAGES_DIR: &str = "images";
const DOCUMENT_EXTENSION: &str = "json";

/// Store persisting records as JSON documents under a root directory.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(TASKS_DIR)).await?;
        fs::create_dir_all(root.join(IMAGES_DIR)).await?;
        debug!(root = %root.display(), "Opened JSON file store");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn task_path(&self, id: TaskId) -> PathBuf {
        self.root
            .join(TASKS_DIR)
            .join(format!("{id}.{DOCUMENT_EXTENSION}"))
    }

    fn images_path(&self, id: TaskId) -> PathBuf {
        self.root
            .join(IMAGES_DIR)
            .join(format!("{id}.{DOCUMENT_EXTENSION}"))
    }

    async fn load_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        read_document(&self.task_path(id)).await
    }

    async fn load_images(&self, id: TaskId) -> StoreResult<BTreeMap<u32, ImageRecord>> {
        Ok(read_document(&self.images_path(id)).await?.unwrap_or_default())
    }

    async fn create(&self, price: Price, source: String) -> StoreResult<Task> {
        let task = Task::new(price, source);
        let _guard = self.write_lock.lock().await;
        write_document(&self.task_path(task.id), &task).await?;
        Ok(task)
    }

    async fn terminal(&self, id: TaskId, update: TerminalUpdate) -> StoreResult<Task> {
        let _guard = self.write_lock.lock().await;
        let mut task = self.load_task(id).await?.ok_or(StoreError::NotFound(id))?;
        task.apply_terminal(update)
            .map_err(|e| StoreError::from_transition(id, e))?;
        write_document(&self.task_path(id), &task).await?;
        Ok(task)
    }

    async fn pending(&self) -> StoreResult<Vec<PendingTask>> {
        let mut entries = fs::read_dir(self.root.join(TASKS_DIR)).await?;
        let mut pending = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            match read_document::<Task>(&path).await {
                Ok(Some(task)) if !task.status.is_terminal() => {
                    let created_at = task.created_at;
                    let item = PendingTask {
                        id: task.id,
                        source: task.source,
                    };
                    pending.push((created_at, item));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable task document");
                }
            }
        }

        pending.sort_by_key(|(created_at, _)| *created_at);
        Ok(pending.into_iter().map(|(_, p)| p).collect())
    }

    async fn upsert_images(&self, task_id: TaskId, records: Vec<ImageRecord>) -> StoreResult<()> {
        if let Some(stray) = records.iter().find(|r| r.task_id != task_id) {
            return Err(StoreError::UnknownTask(stray.task_id));
        }

        let _guard = self.write_lock.lock().await;
        if self.load_task(task_id).await?.is_none() {
            return Err(StoreError::UnknownTask(task_id));
        }

        let mut images = self.load_images(task_id).await?;
        for record in records {
            images.insert(record.width, record);
        }
        write_document(&self.images_path(task_id), &images).await
    }
}

/// Reads and decodes a document, `None` when the file does not exist.
async fn read_document<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes a document via temp file and rename.
async fn write_document<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

impl TaskStore for JsonFileStore {
    fn create_task(&self, price: Price, source: String) -> BoxFuture<'_, StoreResult<Task>> {
        Box::pin(self.create(price, source))
    }

    fn get_task(&self, id: TaskId) -> BoxFuture<'_, StoreResult<Option<Task>>> {
        Box::pin(self.load_task(id))
    }

    fn set_task_terminal(
        &self,
        id: TaskId,
        update: TerminalUpdate,
    ) -> BoxFuture<'_, StoreResult<Task>> {
        Box::pin(self.terminal(id, update))
    }

    fn find_pending_tasks(&self) -> BoxFuture<'_, StoreResult<Vec<PendingTask>>> {
        Box::pin(self.pending())
    }
}

impl ImageStore for JsonFileStore {
    fn insert_image_records(
        &self,
        task_id: TaskId,
        records: Vec<ImageRecord>,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(self.upsert_images(task_id, records))
    }

    fn images_for_task(&self, task_id: TaskId) -> BoxFuture<'_, StoreResult<Vec<ImageRecord>>> {
        Box::pin(async move { Ok(self.load_images(task_id).await?.into_values().collect()) })
    }
}
