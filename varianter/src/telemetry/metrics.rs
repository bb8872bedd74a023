//! Lock-free queue counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::snapshot::QueueSnapshot;

/// Counters recorded by the work queue.
///
/// All updates are relaxed atomic operations; a [`QueueSnapshot`] is a
/// point-in-time copy and may be slightly inconsistent across fields while
/// jobs are in flight.
#[derive(Debug, Default)]
pub struct QueueMetrics {
    submitted: AtomicU64,
    discarded: AtomicU64,
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
    peak_running: AtomicUsize,
}

impl QueueMetrics {
    /// Creates zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// A job was accepted into the queue.
    pub fn job_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// A job was dropped because the queue is closed.
    pub fn job_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// A job began executing while `running` jobs (itself included) were active.
    pub fn job_started(&self, running: usize) {
        self.started.fetch_add(1, Ordering::Relaxed);
        self.peak_running.fetch_max(running, Ordering::Relaxed);
    }

    /// A job handler returned `Ok`.
    pub fn job_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// A job handler returned `Err`.
    pub fn job_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A job handler panicked.
    pub fn job_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of jobs discarded so far.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            peak_running: self.peak_running.load(Ordering::Relaxed),
        }
    }
}
