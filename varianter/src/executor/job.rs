//! Job handler trait and job error type.
//!
//! A job is a small, immutable value describing one unit of deferred work.
//! The queue never looks inside a job beyond its `Debug` form (for logging);
//! it hands each job to a [`JobHandler`] which knows how to run it.
//!
//! # Example
//!
//! ```ignore
//! use varianter::executor::{BoxFuture, JobError, JobHandler};
//!
//! #[derive(Debug)]
//! struct Resize { path: String }
//!
//! struct Resizer;
//!
//! impl JobHandler<Resize> for Resizer {
//!     fn handle(&self, job: Resize) -> BoxFuture<'_, Result<(), JobError>> {
//!         Box::pin(async move {
//!             // Resize logic here...
//!             Ok(())
//!         })
//!     }
//! }
//! ```

use std::fmt;

use crate::store::BoxFuture;

/// Runs jobs of type `J` on behalf of the queue.
///
/// Handlers must be shareable across worker tasks. Returning `Err` marks
/// the job as failed in the queue metrics and logs the error; it has no
/// effect on other jobs.
pub trait JobHandler<J>: Send + Sync + 'static {
    /// Executes one job to completion.
    fn handle(&self, job: J) -> BoxFuture<'_, Result<(), JobError>>;
}

/// Error returned by a job handler.
#[derive(Debug)]
pub struct JobError {
    /// Human-readable error message.
    message: String,
    /// Optional source error.
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl JobError {
    /// Creates a new job error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an error, using its display form as the message.
    pub fn from_error(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(source.to_string()).with_source(source)
    }

    /// Attaches a source error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &_)
    }
}
