//! In-memory store backend.
//!
//! Uses `DashMap` so readers never wait on unrelated writers. Terminal writes
//! hold the entry's shard lock for the whole check-and-set, which makes them
//! atomic per task. Contents are lost when the process exits.

use std::collections::BTreeMap;

use dashmap::DashMap;
use tracing::trace;

use super::traits::{BoxFuture, ImageStore, StoreError, StoreResult, TaskStore};
use crate::task::{ImageRecord, PendingTask, Price, Task, TaskId, TerminalUpdate};

/// Store holding all records in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: DashMap<TaskId, Task>,
    images: DashMap<TaskId, BTreeMap<u32, ImageRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks held.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Inserts a task as-is, bypassing creation.
    ///
    /// Used to seed state, e.g. tasks left pending by an earlier run.
    pub fn insert_task(&self, task: Task) {
        self.tasks.insert(task.id, task);
    }

    fn create(&self, price: Price, source: String) -> Task {
        let task = Task::new(price, source);
        self.tasks.insert(task.id, task.clone());
        trace!(task_id = %task.id, "Task created in memory store");
        task
    }

    fn terminal(&self, id: TaskId, update: TerminalUpdate) -> StoreResult<Task> {
        let mut entry = self.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        entry
            .apply_terminal(update)
            .map_err(|e| StoreError::from_transition(id, e))?;
        Ok(entry.clone())
    }

    fn pending(&self) -> Vec<PendingTask> {
        let mut pending: Vec<_> = self
            .tasks
            .iter()
            .filter(|t| !t.status.is_terminal())
            .map(|t| {
                let pending = PendingTask {
                    id: t.id,
                    source: t.source.clone(),
                };
                (t.created_at, pending)
            })
            .collect();
        pending.sort_by_key(|(created_at, _)| *created_at);
        pending.into_iter().map(|(_, p)| p).collect()
    }

    fn upsert_images(&self, task_id: TaskId, records: Vec<ImageRecord>) -> StoreResult<()> {
        if !self.tasks.contains_key(&task_id) {
            return Err(StoreError::UnknownTask(task_id));
        }
        if let Some(stray) = records.iter().find(|r| r.task_id != task_id) {
            return Err(StoreError::UnknownTask(stray.task_id));
        }
        let mut entry = self.images.entry(task_id).or_default();
        for record in records {
            entry.insert(record.width, record);
        }
        Ok(())
    }
}

impl TaskStore for MemoryStore {
    fn create_task(&self, price: Price, source: String) -> BoxFuture<'_, StoreResult<Task>> {
        let task = self.create(price, source);
        Box::pin(async move { Ok(task) })
    }

    fn get_task(&self, id: TaskId) -> BoxFuture<'_, StoreResult<Option<Task>>> {
        let task = self.tasks.get(&id).map(|t| t.clone());
        Box::pin(async move { Ok(task) })
    }

    fn set_task_terminal(
        &self,
        id: TaskId,
        update: TerminalUpdate,
    ) -> BoxFuture<'_, StoreResult<Task>> {
        let result = self.terminal(id, update);
        Box::pin(async move { result })
    }

    fn find_pending_tasks(&self) -> BoxFuture<'_, StoreResult<Vec<PendingTask>>> {
        let pending = self.pending();
        Box::pin(async move { Ok(pending) })
    }
}

impl ImageStore for MemoryStore {
    fn insert_image_records(
        &self,
        task_id: TaskId,
        records: Vec<ImageRecord>,
    ) -> BoxFuture<'_, StoreResult<()>> {
        let result = self.upsert_images(task_id, records);
        Box::pin(async move { result })
    }

    fn images_for_task(&self, task_id: TaskId) -> BoxFuture<'_, StoreResult<Vec<ImageRecord>>> {
        let images = self
            .images
            .get(&task_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        Box::pin(async move { Ok(images) })
    }
}
