//! Task domain model.
//!
//! A [`Task`] starts `Pending` and is moved exactly once to `Completed` or
//! `Failed` through a [`TerminalUpdate`]. Completed tasks carry one
//! [`VariantReference`] per target width; the same data is duplicated into
//! standalone [`ImageRecord`]s so images can be queried by task.
//!
//! ```text
//!            TerminalUpdate::Completed
//!          ┌──────────────────────────► Completed
//! Pending ─┤
//!          └──────────────────────────► Failed
//!            TerminalUpdate::Failed
//! ```

mod record;
mod types;

pub use record::{
    ImageRecord, PendingTask, Task, TerminalUpdate, TransitionError, VariantReference,
};
pub use types::{ParseTaskIdError, Price, PriceOutOfRange, TaskId, TaskStatus, MAX_PRICE, MIN_PRICE};

/// Widths every task is processed into.
pub const TARGET_WIDTHS: [u32; 2] = [1024, 800];
