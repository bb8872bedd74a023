//! CLI error type.

use std::fmt;

use varianter::app::{AppError, ConfigError};
use varianter::logging::LoggingError;
use varianter::service::ServiceError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem (file, flags).
    Config(String),
    /// Application startup or shutdown failed.
    App(AppError),
    /// The task service rejected the request.
    Service(ServiceError),
    /// Logging could not be initialized.
    Logging(LoggingError),
    /// The Tokio runtime could not be created.
    Runtime(std::io::Error),
    /// Output could not be rendered.
    Output(serde_json::Error),
    /// `submit --wait` gave up before the task finished.
    WaitTimeout { task_id: String, seconds: u64 },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::App(e) => write!(f, "{}", e),
            CliError::Service(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to create Tokio runtime: {}", e),
            CliError::Output(e) => write!(f, "Failed to render output: {}", e),
            CliError::WaitTimeout { task_id, seconds } => write!(
                f,
                "Task {} did not finish within {}s; query it later with 'varianter status {}'",
                task_id, seconds, task_id
            ),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Service(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e)
    }
}
