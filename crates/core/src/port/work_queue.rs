// Work Queue Port
//
// Submitter side (`WorkQueue`) is what the scheduler talks to.
// Executor side (`QueueBackend`) is what the worker drains.

use crate::domain::{JobHandle, QueuedJob, QueuedJobState, TaskRef};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Work queue errors
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    #[error("work queue unavailable: {0}")]
    Unavailable(String),

    #[error("work queue rejected submission: {0}")]
    Rejected(String),

    #[error("work queue storage error: {0}")]
    Storage(String),
}

impl QueueError {
    pub fn class(&self) -> &'static str {
        match self {
            QueueError::Unavailable(_) => "queue_unavailable",
            QueueError::Rejected(_) => "queue_rejected",
            QueueError::Storage(_) => "queue_storage",
        }
    }
}

/// Deferred executor accepting `(callable reference, args, not-before time)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Submit `task` for execution no earlier than `eta`
    async fn submit(&self, task: &TaskRef, eta: DateTime<Utc>) -> std::result::Result<JobHandle, QueueError>;

    /// Cancel a submission.
    ///
    /// Idempotent: cancelling an executed, cancelled or unknown handle is Ok.
    async fn cancel(&self, handle: &JobHandle) -> std::result::Result<(), QueueError>;
}

/// Executor-side view of the queue
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Atomically claim the oldest due job (QUEUED -> RUNNING)
    async fn pop_due(&self, now_millis: i64) -> Result<Option<QueuedJob>>;

    /// Find job by handle
    async fn find(&self, handle: &JobHandle) -> Result<Option<QueuedJob>>;

    /// Find all jobs in a state (for recovery)
    async fn find_by_state(&self, state: QueuedJobState) -> Result<Vec<QueuedJob>>;

    /// Persist state changes of a job
    async fn update(&self, job: &QueuedJob) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory queue implementing both sides
    #[derive(Default)]
    pub struct InMemoryWorkQueue {
        jobs: Mutex<Vec<QueuedJob>>,
        unavailable: AtomicBool,
        next_id: AtomicUsize,
        submits: AtomicUsize,
        cancels: Mutex<Vec<JobHandle>>,
    }

    impl InMemoryWorkQueue {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        pub fn submit_count(&self) -> usize {
            self.submits.load(Ordering::SeqCst)
        }

        /// Handles passed to `cancel`, in call order
        pub fn cancelled(&self) -> Vec<JobHandle> {
            self.cancels.lock().unwrap().clone()
        }

        pub fn job(&self, handle: &JobHandle) -> Option<QueuedJob> {
            self.jobs
                .lock()
                .unwrap()
                .iter()
                .find(|j| &j.handle == handle)
                .cloned()
        }

        pub fn jobs(&self) -> Vec<QueuedJob> {
            self.jobs.lock().unwrap().clone()
        }

        fn check(&self) -> std::result::Result<(), QueueError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(QueueError::Unavailable("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl WorkQueue for InMemoryWorkQueue {
        async fn submit(
            &self,
            task: &TaskRef,
            eta: DateTime<Utc>,
        ) -> std::result::Result<JobHandle, QueueError> {
            self.check()?;
            self.submits.fetch_add(1, Ordering::SeqCst);
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let handle = JobHandle::new(format!("mem-{}", n));
            self.jobs.lock().unwrap().push(QueuedJob::new(
                handle.clone(),
                task.clone(),
                eta.timestamp_millis(),
                0,
            ));
            Ok(handle)
        }

        async fn cancel(&self, handle: &JobHandle) -> std::result::Result<(), QueueError> {
            self.check()?;
            self.cancels.lock().unwrap().push(handle.clone());
            if let Some(job) = self
                .jobs
                .lock()
                .unwrap()
                .iter_mut()
                .find(|j| &j.handle == handle)
            {
                job.cancel(0);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl QueueBackend for InMemoryWorkQueue {
        async fn pop_due(&self, now_millis: i64) -> Result<Option<QueuedJob>> {
            let mut jobs = self.jobs.lock().unwrap();
            let next = jobs
                .iter_mut()
                .filter(|j| j.is_due(now_millis))
                .min_by_key(|j| (j.eta, j.created_at));
            match next {
                Some(job) => {
                    job.start(now_millis)?;
                    Ok(Some(job.clone()))
                }
                None => Ok(None),
            }
        }

        async fn find(&self, handle: &JobHandle) -> Result<Option<QueuedJob>> {
            Ok(self.job(handle))
        }

        async fn find_by_state(&self, state: QueuedJobState) -> Result<Vec<QueuedJob>> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .iter()
                .filter(|j| j.state == state)
                .cloned()
                .collect())
        }

        async fn update(&self, job: &QueuedJob) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.iter_mut().find(|j| j.handle == job.handle) {
                Some(existing) => {
                    *existing = job.clone();
                    Ok(())
                }
                None => Err(crate::error::AppError::NotFound(format!(
                    "Job {} not found",
                    job.handle
                ))),
            }
        }
    }
}
