//! Task submission and query service.
//!
//! [`TaskService`] is the boundary an outer transport (HTTP, CLI) calls:
//!
//! - `submit_task(source)` stores a pending task with a random price and
//!   enqueues its processing, returning immediately
//! - `query_task(id)` reports status, price, and the generated images once
//!   the task completed (or the error once it failed)

mod error;
mod task_service;
mod view;

pub use error::ServiceError;
pub use task_service::{parse_task_id, view_task, TaskService};
pub use view::{SubmittedTask, TaskView, VariantView};
