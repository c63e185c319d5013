// Worker - Deferred job execution loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::reminder::HandlerRegistry;
use crate::error::Result;
use crate::port::{QueueBackend, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Worker drains due jobs from the work queue and runs their handlers
pub struct Worker {
    backend: Arc<dyn QueueBackend>,
    handlers: HandlerRegistry,
    time_provider: Arc<dyn TimeProvider>,
    idle_sleep: Duration,
}

impl Worker {
    pub fn new(
        backend: Arc<dyn QueueBackend>,
        handlers: HandlerRegistry,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            backend,
            handlers,
            time_provider,
            idle_sleep: IDLE_SLEEP_DURATION,
        }
    }

    /// Poll interval while no job is due
    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(handlers = self.handlers.len(), "Worker started");
        loop {
            if shutdown.is_shutdown() {
                info!("Worker shutting down");
                break;
            }
            match self.process_next_job().await {
                Ok(true) => {}
                Ok(false) => {
                    if shutdown.sleep(self.idle_sleep).await {
                        info!("Worker interrupted during idle");
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, class = e.class(), "Worker error");
                    if shutdown.sleep(ERROR_RECOVERY_SLEEP_DURATION).await {
                        info!("Worker interrupted during error recovery");
                        break;
                    }
                }
            }
        }
        info!("Worker stopped");
        Ok(())
    }

    /// Process the next due job (returns true if a job was claimed)
    pub async fn process_next_job(&self) -> Result<bool> {
        let now = self.time_provider.now_millis();

        // Claimed jobs are already RUNNING in the queue
        let mut job = match self.backend.pop_due(now).await? {
            Some(job) => job,
            None => return Ok(false),
        };

        let Some(handler) = self.handlers.get(&job.task.name) else {
            warn!(
                handle = %job.handle,
                task_name = %job.task.name,
                "No handler registered for task"
            );
            job.fail(now, UNKNOWN_TASK_REASON);
            self.backend.update(&job).await?;
            return Ok(true);
        };

        info!(
            handle = %job.handle,
            task_name = %job.task.name,
            attempt = job.attempts,
            "Processing job"
        );

        // Spawned so a panicking handler cannot take the worker down
        let task = job.task.clone();
        let execution = tokio::task::spawn(async move { handler.handle(&task).await }).await;

        let now = self.time_provider.now_millis();
        match execution {
            Ok(Ok(())) => {
                job.complete(now)?;
                info!(handle = %job.handle, "Job completed");
            }
            Ok(Err(e)) => {
                error!(handle = %job.handle, error = %e, class = e.class(), "Job failed");
                job.fail(now, e.to_string());
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "handler panicked"
                } else {
                    "handler cancelled"
                };
                error!(handle = %job.handle, error = ?join_err, "{}", reason);
                job.fail(now, reason);
            }
        }

        self.backend.update(&job).await?;
        Ok(true)
    }
}
