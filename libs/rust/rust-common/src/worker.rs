//! Bounded background worker for fire-and-forget side effects.
//!
//! Jobs are submitted without awaiting their completion. The queue is
//! bounded: when it is full the job is dropped and a warning is logged, so a
//! slow collaborator can never back-pressure the request path. Job failures
//! and panics are captured here and logged, never returned to the submitter.

use crate::PlatformError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::{debug, error, warn};

type BoxedJob = Pin<Box<dyn Future<Output = Result<(), PlatformError>> + Send>>;

struct NamedJob {
    name: &'static str,
    job: BoxedJob,
}

/// Background worker configuration.
#[derive(Debug, Clone)]
pub struct BackgroundWorkerConfig {
    /// Queue name used in log events
    pub name: String,
    /// Maximum number of queued jobs
    pub queue_capacity: usize,
    /// Number of worker tasks draining the queue
    pub workers: usize,
}

impl Default for BackgroundWorkerConfig {
    fn default() -> Self {
        Self {
            name: "background".to_string(),
            queue_capacity: 1024,
            workers: 4,
        }
    }
}

impl BackgroundWorkerConfig {
    /// Create config with custom queue name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Create config with custom queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Create config with custom worker count.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

#[derive(Default)]
struct WorkerStats {
    pending: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    idle: Notify,
}

impl WorkerStats {
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Bounded queue drained by a fixed set of tokio tasks.
#[derive(Clone)]
pub struct BackgroundWorker {
    name: Arc<str>,
    sender: mpsc::Sender<NamedJob>,
    stats: Arc<WorkerStats>,
}

impl std::fmt::Debug for BackgroundWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundWorker")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl BackgroundWorker {
    /// Spawn the worker tasks on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn spawn(config: BackgroundWorkerConfig) -> Self {
        let (sender, receiver) = mpsc::channel::<NamedJob>(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let stats = Arc::new(WorkerStats::default());
        let name: Arc<str> = Arc::from(config.name.as_str());

        for worker_id in 0..config.workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let stats = Arc::clone(&stats);
            let queue = Arc::clone(&name);
            tokio::spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(NamedJob { name, job }) = next else {
                        debug!(queue = %queue, worker_id, "Background worker stopped");
                        break;
                    };

                    // Own task so a panic surfaces as a JoinError, not a dead worker.
                    match tokio::spawn(job).await {
                        Ok(Ok(())) => {
                            stats.completed.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(Err(e)) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            error!(queue = %queue, job = name, error = %e, "Background job failed");
                        }
                        Err(e) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            error!(queue = %queue, job = name, error = %e, "Background job panicked");
                        }
                    }
                    stats.finish_one();
                }
            });
        }

        Self {
            name,
            sender,
            stats,
        }
    }

    /// Submit a job without waiting for it.
    ///
    /// Returns `false` when the job was dropped because the queue is full or
    /// the worker has shut down.
    pub fn submit<F>(&self, name: &'static str, job: F) -> bool
    where
        F: Future<Output = Result<(), PlatformError>> + Send + 'static,
    {
        self.stats.pending.fetch_add(1, Ordering::AcqRel);
        let named = NamedJob {
            name,
            job: Box::pin(job),
        };

        match self.sender.try_send(named) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                self.stats.finish_one();
                warn!(queue = %self.name, job = name, "Background queue full, job dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                self.stats.finish_one();
                warn!(queue = %self.name, job = name, "Background worker closed, job dropped");
                false
            }
        }
    }

    /// Wait until every accepted job has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.stats.idle.notified();
            if self.stats.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Jobs accepted but not yet finished.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.stats.pending.load(Ordering::Acquire)
    }

    /// Jobs that finished successfully.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.stats.completed.load(Ordering::Relaxed)
    }

    /// Jobs that returned an error or panicked.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    /// Jobs rejected at submission.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }
}
