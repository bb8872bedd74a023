//! Error types for the work queue.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by queue operations (never by job execution).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// `drain` reached its deadline with work still pending or running.
    #[error("queue did not drain within {timeout:?} ({pending} pending, {running} running)")]
    DrainTimeout {
        timeout: Duration,
        pending: usize,
        running: usize,
    },

    /// The configured concurrency limit cannot run anything.
    #[error("invalid queue concurrency {0}: must be at least 1")]
    InvalidConcurrency(usize),

    /// The queue was built outside of a Tokio runtime.
    #[error("work queue requires a Tokio runtime")]
    NoRuntime,
}
