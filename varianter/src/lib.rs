//! Varianter - asynchronous image variant generation
//!
//! This library accepts requests to derive fixed-width variants of a source
//! image, processes them on a bounded-concurrency work queue, and exposes
//! the result by polling a task id. Unfinished work survives restarts
//! through a startup recovery pass over the store.
//!
//! # Modules
//!
//! - [`task`] - task model and its pending → completed | failed lifecycle
//! - [`store`] - persistence contract with memory and JSON-file backends
//! - [`executor`] - generic bounded work queue
//! - [`variant`] - fetch, decode, resize, encode and write variants
//! - [`processor`] - drives one task through generation
//! - [`recovery`] - requeues pending tasks at startup
//! - [`service`] - submit/query surface
//! - [`app`] - configuration, bootstrap and shutdown
//! - [`logging`] - tracing subscriber setup
//! - [`telemetry`] - queue counters

pub mod app;
pub mod executor;
pub mod logging;
pub mod processor;
pub mod recovery;
pub mod service;
pub mod store;
pub mod task;
pub mod telemetry;
pub mod variant;

/// Crate version, as set in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
