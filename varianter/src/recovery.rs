//! Startup recovery of unfinished work.
//!
//! The work queue lives only in memory, so tasks that were pending when the
//! process stopped are found again in the store and resubmitted. Recovery
//! is unconditional: every pending task is requeued, with no retry counter.

use serde::Serialize;
use tracing::{info, warn};

use crate::executor::{BoundedWorkQueue, SubmitOutcome};
use crate::processor::ProcessTaskJob;
use crate::store::{Store, StoreError};

/// Counts from one recovery pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Pending tasks found in the store.
    pub found: usize,
    /// Jobs the queue accepted.
    pub accepted: usize,
    /// Jobs dropped because the queue was already closed.
    pub discarded: usize,
}

/// Resubmits every pending task once.
///
/// Consumed by [`run`](Self::run), so a scanner cannot be run twice.
pub struct RecoveryScanner<'a> {
    store: &'a dyn Store,
    queue: &'a BoundedWorkQueue<ProcessTaskJob>,
}

impl<'a> RecoveryScanner<'a> {
    pub fn new(store: &'a dyn Store, queue: &'a BoundedWorkQueue<ProcessTaskJob>) -> Self {
        Self { store, queue }
    }

    /// Lists pending tasks and submits one job per task.
    pub async fn run(self) -> Result<RecoveryReport, StoreError> {
        let pending = self.store.find_pending_tasks().await?;
        let mut report = RecoveryReport {
            found: pending.len(),
            ..RecoveryReport::default()
        };

        for task in pending {
            match self.queue.submit(ProcessTaskJob::from(task)) {
                SubmitOutcome::Accepted => report.accepted += 1,
                SubmitOutcome::Discarded => report.discarded += 1,
            }
        }

        if report.discarded > 0 {
            warn!(
                discarded = report.discarded,
                "Queue closed during recovery, some pending tasks were not requeued"
            );
        }
        info!(
            found = report.found,
            accepted = report.accepted,
            "Recovery pass complete"
        );
        Ok(report)
    }
}
