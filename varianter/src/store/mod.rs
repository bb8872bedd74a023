//! Task and image persistence.
//!
//! The processing core talks to storage only through [`TaskStore`] and
//! [`ImageStore`]. Two backends are provided:
//!
//! - [`MemoryStore`] - process-local, for tests and throwaway runs
//! - [`JsonFileStore`] - one JSON document per task on disk, survives restarts
//!
//! ```text
//! ┌───────────────┐     ┌───────────────┐
//! │ TaskProcessor │     │  TaskService  │
//! └───────┬───────┘     └───────┬───────┘
//!         │  Arc<dyn TaskStore + ImageStore>
//!         ▼                     ▼
//! ┌─────────────────────────────────────┐
//! │     MemoryStore | JsonFileStore     │
//! └─────────────────────────────────────┘
//! ```

mod json_file;
mod memory;
mod traits;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{BoxFuture, ImageStore, StoreError, StoreResult, TaskStore};

/// A backend implementing both halves of the store contract.
pub trait Store: TaskStore + ImageStore {}

impl<T: TaskStore + ImageStore + ?Sized> Store for T {}
