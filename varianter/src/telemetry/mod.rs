//! Queue telemetry for observability.
//!
//! Lock-free atomic counters updated by the work queue, plus a copyable
//! snapshot for display and assertions.
//!
//! # Architecture
//!
//! ```text
//! BoundedWorkQueue ─────► QueueMetrics ─────► QueueSnapshot ─────► Views
//!                        (atomic counters)   (point-in-time copy)  (CLI, logs)
//! ```
//!
//! Jobs discarded by a closed queue are counted here rather than silently
//! dropped, so operators can see lost work during shutdown.

mod metrics;
mod snapshot;

pub use metrics::QueueMetrics;
pub use snapshot::QueueSnapshot;
