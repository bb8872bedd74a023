//! Task processing.
//!
//! [`TaskProcessor`] turns one pending task into a terminal one:
//!
//! ```text
//! get_task ──► terminal? ──yes──► AlreadyTerminal (no write)
//!                 │ no
//!                 ▼
//!          generate(1024, 800)
//!           │ ok          │ err
//!           ▼             │
//!   insert_image_records  │
//!    │ ok     │ err       │
//!    ▼        ▼           ▼
//! Completed  Failed    Failed        (one set_task_terminal)
//! ```
//!
//! It implements [`JobHandler`](crate::executor::JobHandler) for
//! [`ProcessTaskJob`], which is how the work queue runs it.

mod error;
mod job;
mod task_processor;

pub use error::{ProcessError, TaskOutcome};
pub use job::ProcessTaskJob;
pub use task_processor::TaskProcessor;
