//! Bounded-concurrency FIFO work queue.
//!
//! Jobs are dispatched in submission order to at most `concurrency` workers.
//! A worker that finishes a job immediately claims the next pending one, so a
//! freed slot never sits idle while work is waiting.
//!
//! # Guarantees
//!
//! 1. At most `concurrency` jobs execute at any instant
//! 2. Jobs start in FIFO order (no priorities, no reordering)
//! 3. A failing or panicking job is logged and counted; it never stops the
//!    queue or affects other jobs
//! 4. `submit` never blocks; on a closed queue the job is discarded and
//!    counted in [`QueueMetrics`]
//!
//! # Example
//!
//! ```ignore
//! use varianter::executor::{BoundedWorkQueue, QueueConfig};
//!
//! let queue = BoundedWorkQueue::new(QueueConfig::default(), handler)?;
//! queue.submit(job);
//!
//! // Wait until nothing is pending or running
//! queue.drain(Duration::from_secs(30)).await?;
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::error::QueueError;
use super::job::JobHandler;
use crate::telemetry::QueueMetrics;

// =============================================================================
// Configuration
// =============================================================================

/// Default number of jobs allowed to run at once.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Configuration for a [`BoundedWorkQueue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of jobs executing simultaneously. Fixed for the
    /// lifetime of the queue.
    pub concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl QueueConfig {
    /// Creates a configuration with the given concurrency limit.
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency }
    }
}

/// What happened to a submitted job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The job was queued and will run.
    Accepted,
    /// The queue is closed; the job was dropped and counted.
    Discarded,
}

// =============================================================================
// Shared State
// =============================================================================

struct QueueState<J> {
    pending: VecDeque<J>,
    running: usize,
    closed: bool,
}

struct Shared<J> {
    state: Mutex<QueueState<J>>,
    handler: Arc<dyn JobHandler<J>>,
    concurrency: usize,
    idle: Notify,
    metrics: QueueMetrics,
    runtime: Handle,
}

impl<J> Shared<J> {
    /// Pops the next job for a worker that just finished, or releases its slot.
    fn next_for_worker(&self) -> Option<J> {
        let mut state = self.state.lock();
        match state.pending.pop_front() {
            Some(job) => {
                self.metrics.job_started(state.running);
                Some(job)
            }
            None => {
                state.running -= 1;
                if state.running == 0 {
                    self.idle.notify_waiters();
                }
                None
            }
        }
    }

    fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.pending.is_empty() && state.running == 0
    }

    fn load(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.pending.len(), state.running)
    }
}

// =============================================================================
// Bounded Work Queue
// =============================================================================

/// FIFO queue executing jobs with a fixed maximum concurrency.
///
/// Cheap to clone; clones share the same queue. Jobs of type `J` are plain
/// values handed to the queue's [`JobHandler`]; their `Debug` form is used
/// in log output.
///
/// A handler that keeps a clone of the queue (to enqueue follow-up jobs)
/// forms a reference cycle; such a queue lives until the process exits.
pub struct BoundedWorkQueue<J> {
    shared: Arc<Shared<J>>,
}

impl<J> Clone for BoundedWorkQueue<J> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<J> fmt::Debug for BoundedWorkQueue<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (pending, running) = self.shared.load();
        f.debug_struct("BoundedWorkQueue")
            .field("concurrency", &self.shared.concurrency)
            .field("pending", &pending)
            .field("running", &running)
            .finish()
    }
}

impl<J> BoundedWorkQueue<J>
where
    J: fmt::Debug + Send + 'static,
{
    /// Creates a queue on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`QueueError::InvalidConcurrency`] when `concurrency` is zero
    /// - [`QueueError::NoRuntime`] when called outside a Tokio runtime
    pub fn new(config: QueueConfig, handler: Arc<dyn JobHandler<J>>) -> Result<Self, QueueError> {
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        Self::with_runtime(config, handler, runtime)
    }

    /// Creates a queue whose workers are spawned on `runtime`.
    pub fn with_runtime(
        config: QueueConfig,
        handler: Arc<dyn JobHandler<J>>,
        runtime: Handle,
    ) -> Result<Self, QueueError> {
        if config.concurrency == 0 {
            return Err(QueueError::InvalidConcurrency(config.concurrency));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    running: 0,
                    closed: false,
                }),
                handler,
                concurrency: config.concurrency,
                idle: Notify::new(),
                metrics: QueueMetrics::new(),
                runtime,
            }),
        })
    }

    /// Enqueues a job without waiting for it to run.
    ///
    /// On a closed queue the job is dropped, logged, and counted as
    /// discarded.
    pub fn submit(&self, job: J) -> SubmitOutcome {
        let mut state = self.shared.state.lock();

        if state.closed {
            drop(state);
            self.shared.metrics.job_discarded();
            warn!(job = ?job, "Queue closed - discarding job");
            return SubmitOutcome::Discarded;
        }

        debug!(job = ?job, pending = state.pending.len(), "Job queued");
        state.pending.push_back(job);
        self.shared.metrics.job_submitted();

        while state.running < self.shared.concurrency {
            let Some(next) = state.pending.pop_front() else {
                break;
            };
            state.running += 1;
            self.shared.metrics.job_started(state.running);
            self.shared
                .runtime
                .spawn(run_worker(Arc::clone(&self.shared), next));
        }

        SubmitOutcome::Accepted
    }

    /// Waits until no job is pending or running.
    ///
    /// Jobs submitted while draining (including by other jobs) are waited
    /// for as well. Returns immediately when the queue is already idle.
    /// Never cancels work.
    ///
    /// # Errors
    ///
    /// [`QueueError::DrainTimeout`] when work remains after `timeout`.
    pub async fn drain(&self, timeout: Duration) -> Result<(), QueueError> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a wake-up between check and await is not lost.
            notified.as_mut().enable();

            if self.shared.is_idle() {
                return Ok(());
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let (pending, running) = self.shared.load();
                if pending == 0 && running == 0 {
                    return Ok(());
                }
                return Err(QueueError::DrainTimeout {
                    timeout,
                    pending,
                    running,
                });
            }
        }
    }
}

impl<J> BoundedWorkQueue<J> {
    /// Stops accepting new jobs. Queued and running jobs still complete.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if !state.closed {
            state.closed = true;
            debug!(pending = state.pending.len(), running = state.running, "Queue closed");
        }
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Number of jobs waiting for a slot.
    pub fn pending_len(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Number of jobs currently executing.
    pub fn running(&self) -> usize {
        self.shared.state.lock().running
    }

    /// The fixed concurrency limit.
    pub fn concurrency(&self) -> usize {
        self.shared.concurrency
    }

    /// Queue counters.
    pub fn metrics(&self) -> &QueueMetrics {
        &self.shared.metrics
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Runs `first`, then keeps claiming pending jobs until none are left.
async fn run_worker<J>(shared: Arc<Shared<J>>, first: J)
where
    J: fmt::Debug + Send + 'static,
{
    let mut job = first;
    loop {
        execute(&shared, job).await;
        match shared.next_for_worker() {
            Some(next) => job = next,
            None => return,
        }
    }
}

/// Executes one job, isolating its failure or panic.
async fn execute<J>(shared: &Shared<J>, job: J)
where
    J: fmt::Debug + Send + 'static,
{
    let label = format!("{job:?}");
    let started = Instant::now();

    // Building the future may itself panic, so it happens inside the guard.
    let outcome = AssertUnwindSafe(async move { shared.handler.handle(job).await })
        .catch_unwind()
        .await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(())) => {
            shared.metrics.job_succeeded();
            debug!(job = %label, duration_ms, "Job finished");
        }
        Ok(Err(e)) => {
            shared.metrics.job_failed();
            error!(job = %label, duration_ms, error = %e, "Job failed");
        }
        Err(panic) => {
            shared.metrics.job_panicked();
            error!(
                job = %label,
                duration_ms,
                panic = panic_message(panic.as_ref()),
                "Job panicked"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::JobError;
    use crate::store::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    #[derive(Debug)]
    enum TestJob {
        Sleep(u32, u64),
        Fail(u32),
        Panic(u32),
        PanicOnHandle(u32),
        SpawnChild(u32),
    }

    /// Handler recording start order and concurrent occupancy.
    #[derive(Default)]
    struct Recorder {
        current: AtomicUsize,
        peak: AtomicUsize,
        started: parking_lot::Mutex<Vec<u32>>,
        finished: parking_lot::Mutex<Vec<u32>>,
        queue: OnceLock<BoundedWorkQueue<TestJob>>,
    }

    impl Recorder {
        fn enter(&self, id: u32) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.started.lock().push(id);
        }

        fn exit(&self, id: u32) {
            self.current.fetch_sub(1, Ordering::SeqCst);
            self.finished.lock().push(id);
        }
    }

    impl JobHandler<TestJob> for Recorder {
        fn handle(&self, job: TestJob) -> BoxFuture<'_, Result<(), JobError>> {
            if let TestJob::PanicOnHandle(id) = job {
                panic!("job {id} exploded before returning a future");
            }
            Box::pin(async move {
                match job {
                    TestJob::Sleep(id, ms) => {
                        self.enter(id);
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        self.exit(id);
                        Ok(())
                    }
                    TestJob::Fail(id) => {
                        self.enter(id);
                        self.exit(id);
                        Err(JobError::new(format!("job {id} failed")))
                    }
                    TestJob::Panic(id) => {
                        self.enter(id);
                        self.exit(id);
                        panic!("job {id} exploded");
                    }
                    TestJob::PanicOnHandle(_) => unreachable!(),
                    TestJob::SpawnChild(id) => {
                        self.enter(id);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        if let Some(queue) = self.queue.get() {
                            queue.submit(TestJob::Sleep(id + 100, 30));
                        }
                        self.exit(id);
                        Ok(())
                    }
                }
            })
        }
    }

    fn queue_with(concurrency: usize) -> (BoundedWorkQueue<TestJob>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let queue = BoundedWorkQueue::new(
            QueueConfig::new(concurrency),
            Arc::clone(&recorder) as Arc<dyn JobHandler<TestJob>>,
        )
        .unwrap();
        (queue, recorder)
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let recorder: Arc<dyn JobHandler<TestJob>> = Arc::new(Recorder::default());
        let err = BoundedWorkQueue::new(QueueConfig::default(), recorder).unwrap_err();
        assert_eq!(err, QueueError::NoRuntime);
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let recorder: Arc<dyn JobHandler<TestJob>> = Arc::new(Recorder::default());
        let err = BoundedWorkQueue::new(QueueConfig::new(0), recorder).unwrap_err();
        assert_eq!(err, QueueError::InvalidConcurrency(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_concurrency_limit() {
        let (queue, recorder) = queue_with(2);

        for id in 0..12 {
            assert_eq!(queue.submit(TestJob::Sleep(id, 15)), SubmitOutcome::Accepted);
        }
        assert!(queue.running() <= 2);

        queue.drain(Duration::from_secs(5)).await.unwrap();

        assert_eq!(recorder.peak.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.finished.lock().len(), 12);
        let snapshot = queue.metrics().snapshot();
        assert_eq!(snapshot.peak_running, 2);
        assert_eq!(snapshot.succeeded, 12);
    }

    #[tokio::test]
    async fn test_jobs_start_in_fifo_order() {
        let (queue, recorder) = queue_with(1);

        for id in 0..5 {
            queue.submit(TestJob::Sleep(id, 1));
        }
        queue.drain(Duration::from_secs(5)).await.unwrap();

        assert_eq!(*recorder.started.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failing_job_does_not_stop_others() {
        let (queue, recorder) = queue_with(2);

        queue.submit(TestJob::Fail(1));
        queue.submit(TestJob::Sleep(2, 5));
        queue.submit(TestJob::Fail(3));
        queue.submit(TestJob::Sleep(4, 5));
        queue.drain(Duration::from_secs(5)).await.unwrap();

        let mut finished = recorder.finished.lock().clone();
        finished.sort_unstable();
        assert_eq!(finished, vec![1, 2, 3, 4]);

        let snapshot = queue.metrics().snapshot();
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.succeeded, 2);
        assert_eq!(queue.running(), 0);
    }

    #[tokio::test]
    async fn test_panicking_job_releases_its_slot() {
        let (queue, recorder) = queue_with(1);

        queue.submit(TestJob::Panic(1));
        queue.submit(TestJob::Sleep(2, 1));
        queue.drain(Duration::from_secs(5)).await.unwrap();

        assert!(recorder.finished.lock().contains(&2));
        let snapshot = queue.metrics().snapshot();
        assert_eq!(snapshot.panicked, 1);
        assert_eq!(snapshot.succeeded, 1);
    }

    #[tokio::test]
    async fn test_handler_panicking_before_future_releases_its_slot() {
        let (queue, recorder) = queue_with(1);

        queue.submit(TestJob::PanicOnHandle(0));
        queue.submit(TestJob::Sleep(1, 1));
        queue.submit(TestJob::Sleep(2, 1));
        queue.drain(Duration::from_secs(5)).await.unwrap();

        assert_eq!(*recorder.finished.lock(), vec![1, 2]);
        assert_eq!(queue.running(), 0);
        assert_eq!(queue.pending_len(), 0);
        let snapshot = queue.metrics().snapshot();
        assert_eq!(snapshot.panicked, 1);
        assert_eq!(snapshot.succeeded, 2);
    }

    #[tokio::test]
    async fn test_drain_on_idle_queue_returns_immediately() {
        let (queue, _recorder) = queue_with(2);
        tokio::time::timeout(Duration::from_millis(100), queue.drain(Duration::ZERO))
            .await
            .expect("drain should not wait")
            .unwrap();
    }

    #[tokio::test]
    async fn test_drain_waits_for_jobs_submitted_by_jobs() {
        let (queue, recorder) = queue_with(2);
        recorder.queue.set(queue.clone()).unwrap();

        queue.submit(TestJob::SpawnChild(1));
        queue.submit(TestJob::SpawnChild(2));
        queue.drain(Duration::from_secs(5)).await.unwrap();

        let mut finished = recorder.finished.lock().clone();
        finished.sort_unstable();
        assert_eq!(finished, vec![1, 2, 101, 102]);
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.running(), 0);
    }

    #[tokio::test]
    async fn test_drain_timeout_does_not_cancel() {
        let (queue, recorder) = queue_with(1);

        queue.submit(TestJob::Sleep(1, 200));
        queue.submit(TestJob::Sleep(2, 1));

        let err = queue.drain(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, QueueError::DrainTimeout { running: 1, .. }));

        queue.drain(Duration::from_secs(5)).await.unwrap();
        assert_eq!(*recorder.finished.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_close_discards_new_jobs_but_finishes_queued_ones() {
        let (queue, recorder) = queue_with(1);

        queue.submit(TestJob::Sleep(1, 10));
        queue.submit(TestJob::Sleep(2, 1));
        queue.close();

        assert!(queue.is_closed());
        assert_eq!(queue.submit(TestJob::Sleep(3, 1)), SubmitOutcome::Discarded);

        queue.drain(Duration::from_secs(5)).await.unwrap();

        assert_eq!(*recorder.finished.lock(), vec![1, 2]);
        let snapshot = queue.metrics().snapshot();
        assert_eq!(snapshot.discarded, 1);
        assert_eq!(snapshot.submitted, 2);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let (queue, _recorder) = queue_with(3);
        let clone = queue.clone();
        clone.close();
        assert!(queue.is_closed());
        assert_eq!(queue.concurrency(), 3);
    }
}
