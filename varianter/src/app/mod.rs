//! Application bootstrap and lifecycle management.
//!
//! This module provides the [`App`] type which handles initialization
//! sequencing, startup recovery, and graceful shutdown.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                             App                              │
//! │                                                              │
//! │  1. Store (MemoryStore | JsonFileStore)                      │
//! │                                                              │
//! │  2. VariantGenerator ──► TaskProcessor (JobHandler)          │
//! │                              │                               │
//! │  3. BoundedWorkQueue<ProcessTaskJob> ◄───────┘               │
//! │                                                              │
//! │  4. RecoveryScanner: pending tasks ──► queue                 │
//! │                                                              │
//! │  5. TaskService (submit_task / query_task)                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use varianter::app::{App, ConfigFile};
//!
//! let config = ConfigFile::load_or_default(&ConfigFile::default_path())?;
//! let app = App::start(config).await?;
//! let view = app.service().query_task("0b9d...").await?;
//! app.shutdown().await?;
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::{open_store, App};
pub use config::{
    default_data_dir, AppConfig, ConfigError, ConfigFile, GeneratorConfig, LoggingConfig,
    StorageBackend, StorageConfig, DEFAULT_DRAIN_TIMEOUT, DEFAULT_LOG_LEVEL,
};
pub use error::AppError;
