//! Application bootstrap implementation.
//!
//! This module contains [`App`], which wires the store, generator,
//! processor, work queue and service together in the right order and runs
//! the startup recovery pass before anything else is submitted.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::config::{AppConfig, StorageBackend, StorageConfig};
use super::error::AppError;
use crate::executor::BoundedWorkQueue;
use crate::processor::{ProcessTaskJob, TaskProcessor};
use crate::recovery::{RecoveryReport, RecoveryScanner};
use crate::service::TaskService;
use crate::store::{JsonFileStore, MemoryStore, Store};
use crate::telemetry::QueueSnapshot;
use crate::variant::{AsyncHttpClient, ReqwestClient, VariantGenerator};

/// Varianter application with service lifecycle management.
///
/// Startup order:
/// 1. Store opened (JSON directory created if needed)
/// 2. Output directory created
/// 3. Generator, processor and work queue built
/// 4. Recovery: every pending task from a previous run is resubmitted
/// 5. Task service ready for submissions
///
/// # Example
///
/// ```ignore
/// use varianter::app::{App, AppConfig};
///
/// let app = App::start(AppConfig::default()).await?;
/// let submitted = app.service().submit_task("/photos/cat.jpg").await?;
///
/// // Later: graceful shutdown
/// app.shutdown().await?;
/// ```
pub struct App {
    config: AppConfig,
    store: Arc<dyn Store>,
    service: TaskService,
    recovery: RecoveryReport,
}

impl App {
    /// Start the application, opening the store named by the config.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        let store = open_store(&config.storage).await?;
        Self::start_with_store(config, store).await
    }

    /// Start the application on an existing store.
    pub async fn start_with_store(
        config: AppConfig,
        store: Arc<dyn Store>,
    ) -> Result<Self, AppError> {
        let http = Arc::new(ReqwestClient::with_timeout(config.generator.http_timeout)?);
        Self::start_with_parts(config, store, http).await
    }

    /// Start the application with an injected store and HTTP client.
    pub async fn start_with_parts(
        config: AppConfig,
        store: Arc<dyn Store>,
        http: Arc<dyn AsyncHttpClient>,
    ) -> Result<Self, AppError> {
        info!(
            backend = %config.storage.backend,
            concurrency = config.queue.concurrency,
            output_dir = %config.generator.output_dir.display(),
            "Starting varianter"
        );

        let output_dir = config.generator.output_dir.clone();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| AppError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;

        let generator = Arc::new(VariantGenerator::new(output_dir, http));
        let processor = Arc::new(TaskProcessor::new(
            Arc::clone(&store),
            generator,
            config.generator.options.clone(),
        ));
        let queue: BoundedWorkQueue<ProcessTaskJob> =
            BoundedWorkQueue::new(config.queue.clone(), processor)?;

        let recovery = RecoveryScanner::new(store.as_ref(), &queue).run().await?;
        if recovery.found > 0 {
            info!(requeued = recovery.accepted, "Resumed pending tasks from previous run");
        }

        let service = TaskService::new(Arc::clone(&store), queue);

        Ok(Self {
            config,
            store,
            service,
            recovery,
        })
    }

    /// Submission and query surface.
    pub fn service(&self) -> &TaskService {
        &self.service
    }

    /// The underlying store.
    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Result of the startup recovery pass.
    pub fn recovery_report(&self) -> RecoveryReport {
        self.recovery
    }

    /// Current queue counters.
    pub fn queue_snapshot(&self) -> QueueSnapshot {
        self.service.queue().metrics().snapshot()
    }

    /// Waits until all queued and running work is finished.
    ///
    /// Does not close the queue; new submissions are still accepted.
    pub async fn wait_idle(&self, timeout: Duration) -> Result<(), AppError> {
        self.service.queue().drain(timeout).await?;
        Ok(())
    }

    /// Shutdown the application gracefully.
    ///
    /// Stops accepting work, then waits up to the configured drain timeout
    /// for queued and running tasks. Tasks still pending afterwards are
    /// picked up by the next start's recovery pass.
    pub async fn shutdown(self) -> Result<QueueSnapshot, AppError> {
        info!("Shutting down varianter");

        let queue = self.service.queue();
        queue.close();
        if let Err(e) = queue.drain(self.config.drain_timeout).await {
            warn!(error = %e, "Shutdown drain timed out; unfinished tasks stay pending");
            return Err(e.into());
        }

        let snapshot = queue.metrics().snapshot();
        info!(
            succeeded = snapshot.succeeded,
            failed = snapshot.failed,
            discarded = snapshot.discarded,
            "Varianter shutdown complete"
        );
        Ok(snapshot)
    }
}

/// Opens the store backend named by `config`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn Store>, AppError> {
    let store: Arc<dyn Store> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Json => Arc::new(JsonFileStore::open(config.directory.clone()).await?),
    };
    Ok(store)
}
