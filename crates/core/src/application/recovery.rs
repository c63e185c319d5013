// Crash recovery of the embedded work queue
use crate::domain::QueuedJobState;
use crate::port::{QueueBackend, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::worker::constants::DEFAULT_RECOVERY_WINDOW_MS;

/// Crash recovery service
///
/// On daemon startup, requeues jobs that were RUNNING when the previous
/// process died. Reminder handlers are idempotent enough to run twice (at
/// worst a duplicate e-mail), so every orphan goes back to QUEUED.
pub struct RecoveryService {
    backend: Arc<dyn QueueBackend>,
    time_provider: Arc<dyn TimeProvider>,
    recovery_window_ms: i64,
}

impl RecoveryService {
    /// Create a new recovery service
    ///
    /// # Arguments
    /// * `backend` - Executor side of the work queue
    /// * `time_provider` - Time provider
    /// * `recovery_window_ms` - Optional custom recovery window (default: 5 minutes)
    pub fn new(
        backend: Arc<dyn QueueBackend>,
        time_provider: Arc<dyn TimeProvider>,
        recovery_window_ms: Option<i64>,
    ) -> Self {
        Self {
            backend,
            time_provider,
            recovery_window_ms: recovery_window_ms.unwrap_or(DEFAULT_RECOVERY_WINDOW_MS),
        }
    }

    /// Requeue RUNNING jobs started before `now - recovery_window`
    ///
    /// # Returns
    /// Number of jobs recovered
    pub async fn recover_orphaned_jobs(&self) -> crate::error::Result<usize> {
        let now = self.time_provider.now_millis();
        let cutoff = now - self.recovery_window_ms;

        info!(
            cutoff_time = %cutoff,
            recovery_window_ms = %self.recovery_window_ms,
            "Starting orphaned job recovery"
        );

        let running_jobs = self.backend.find_by_state(QueuedJobState::Running).await?;
        let mut recovered_count = 0;

        for mut job in running_jobs {
            match job.started_at {
                Some(started_at) if started_at >= cutoff => continue,
                Some(started_at) => {
                    info!(
                        handle = %job.handle,
                        started_at = %started_at,
                        attempts = job.attempts,
                        "Requeueing orphaned job"
                    );
                }
                None => {
                    warn!(handle = %job.handle, "RUNNING job without started_at, requeueing");
                }
            }

            job.state = QueuedJobState::Queued;
            job.started_at = None;
            self.backend.update(&job).await?;
            recovered_count += 1;
        }

        info!(recovered_count = %recovered_count, "Orphaned job recovery complete");
        Ok(recovered_count)
    }
}
