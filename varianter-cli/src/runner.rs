//! Shared setup for commands that touch the store or the queue.

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::runtime::Runtime;
use tracing::info;
use varianter::app::{AppConfig, ConfigFile};
use varianter::logging::{init_logging, LoggingGuard};

use crate::error::CliError;

/// Loaded configuration, installed logging and a Tokio runtime.
pub struct CliRunner {
    config: AppConfig,
    config_path: PathBuf,
    runtime: Runtime,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Loads config from `config_path` (or the default location), applies
    /// `data_dir` when given, and installs logging.
    pub fn new(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(ConfigFile::default_path);
        let mut config = ConfigFile::load_or_default(&config_path)?;
        if let Some(root) = data_dir {
            config = config
                .with_store_dir(root.join("store"))
                .with_output_dir(root.join("variants"));
        }

        let logging = init_logging(&config.logging)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            config,
            config_path,
            runtime,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Logs the command being run and where its config came from.
    pub fn log_startup(&self, command: &str) {
        info!(
            command = command,
            version = varianter::VERSION,
            config = %self.config_path.display(),
            store = %self.config.storage.directory.display(),
            "varianter starting"
        );
    }

    /// Runs a future to completion on the runner's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
