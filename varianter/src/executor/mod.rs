//! Generic bounded-concurrency job execution.
//!
//! The executor knows nothing about images or tasks. It runs typed job
//! values through a [`JobHandler`] with a fixed concurrency limit.
//!
//! # Architecture
//!
//! ```text
//! submit(job) ──► ┌──────────────────────────┐
//!                 │ pending: VecDeque<J>     │  FIFO
//!                 └────────────┬─────────────┘
//!                              │ running < concurrency
//!                              ▼
//!                 ┌──────────────────────────┐
//!                 │ worker (tokio task)      │──► JobHandler::handle(job)
//!                 │  loops while pending > 0 │
//!                 └────────────┬─────────────┘
//!                              │ last worker exits
//!                              ▼
//!                      drain() waiters woken
//! ```

mod error;
mod job;
mod queue;

pub use error::QueueError;
pub use job::{JobError, JobHandler};
pub use queue::{BoundedWorkQueue, QueueConfig, SubmitOutcome, DEFAULT_CONCURRENCY};

pub use crate::store::BoxFuture;
