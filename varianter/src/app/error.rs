//! Application error types.

use std::fmt;
use std::path::PathBuf;

use super::config::ConfigError;
use crate::executor::QueueError;
use crate::store::StoreError;
use crate::variant::HttpError;

/// Errors that can occur during application lifecycle.
#[derive(Debug)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid.
    Config(ConfigError),

    /// The store could not be opened or the recovery scan failed.
    Store(StoreError),

    /// The HTTP client for remote sources could not be built.
    HttpClient(HttpError),

    /// The work queue could not be created or did not drain in time.
    Queue(QueueError),

    /// The variant output directory could not be created.
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Store(e) => write!(f, "Store error: {}", e),
            AppError::HttpClient(e) => write!(f, "HTTP client error: {}", e),
            AppError::Queue(e) => write!(f, "Work queue error: {}", e),
            AppError::OutputDir { path, source } => write!(
                f,
                "Failed to create output directory {}: {}",
                path.display(),
                source
            ),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Store(e) => Some(e),
            AppError::HttpClient(e) => Some(e),
            AppError::Queue(e) => Some(e),
            AppError::OutputDir { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        AppError::HttpClient(e)
    }
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        AppError::Queue(e)
    }
}
