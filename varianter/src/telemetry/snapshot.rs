//! Point-in-time view of queue metrics.

use serde::Serialize;

/// Copy of the queue counters at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    /// Jobs accepted by `submit`.
    pub submitted: u64,
    /// Jobs dropped because the queue was closed.
    pub discarded: u64,
    /// Jobs that began executing.
    pub started: u64,
    /// Jobs whose handler returned `Ok`.
    pub succeeded: u64,
    /// Jobs whose handler returned `Err`.
    pub failed: u64,
    /// Jobs whose handler panicked.
    pub panicked: u64,
    /// Highest number of jobs observed running at once.
    pub peak_running: usize,
}

impl QueueSnapshot {
    /// Jobs that ran to an outcome, whatever it was.
    pub fn finished(&self) -> u64 {
        self.succeeded + self.failed + self.panicked
    }

    /// Fraction of finished jobs that did not succeed (0.0 when none finished).
    pub fn failure_rate(&self) -> f64 {
        let finished = self.finished();
        if finished == 0 {
            return 0.0;
        }
        (self.failed + self.panicked) as f64 / finished as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_rate() {
        let snapshot = QueueSnapshot {
            succeeded: 3,
            failed: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.finished(), 4);
        assert!((snapshot.failure_rate() - 0.25).abs() < f64::EPSILON);
        assert_eq!(QueueSnapshot::default().failure_rate(), 0.0);
    }
}
