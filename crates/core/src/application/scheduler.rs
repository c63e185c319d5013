//! Scheduler - Keeps at most one live reminder job per entity
//!
//! Coordinates two independently failing systems:
//! - the work queue, which executes the job later and issues its handle
//! - the job store, which remembers the current handle per `(job_kind, entity_id)`
//!
//! Calls for the same entity must be serialized by the caller (its own
//! persistence transaction); concurrent reschedules of one entity are
//! last-write-wins in the job store.

use crate::domain::{EntityId, JobHandle, JobKey, JobKind, TaskRef};
use crate::error::{AppError, Failure, Operation, Result};
use crate::port::{JobStore, WorkQueue};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default lead time between a reminder and its deadline
pub const DEFAULT_LEAD_TIME: TimeDelta = TimeDelta::hours(1);

/// Acknowledgment of a scheduled job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleAck {
    pub key: JobKey,
    pub handle: JobHandle,
    pub run_at: DateTime<Utc>,
    /// False when the job store write failed: the job will fire but cannot be
    /// revoked through this scheduler (orphaned)
    pub indexed: bool,
}

/// Acknowledgment of a revoke
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevokeAck {
    /// No stored handle; nothing was touched
    NothingScheduled,
    Revoked {
        handle: JobHandle,
        /// Work queue acknowledged the cancellation
        cancelled: bool,
        /// Job store key was deleted
        unindexed: bool,
    },
}

/// Scheduler owns the `task: {job_kind}: {entity_id}` key space
pub struct Scheduler {
    work_queue: Arc<dyn WorkQueue>,
    job_store: Arc<dyn JobStore>,
    lead_time: TimeDelta,
}

impl Scheduler {
    pub fn new(
        work_queue: Arc<dyn WorkQueue>,
        job_store: Arc<dyn JobStore>,
        lead_time: TimeDelta,
    ) -> Self {
        Self {
            work_queue,
            job_store,
            lead_time,
        }
    }

    pub fn lead_time(&self) -> TimeDelta {
        self.lead_time
    }

    /// Reminder time for a deadline
    pub fn notify_at(&self, deadline: DateTime<Utc>) -> DateTime<Utc> {
        deadline - self.lead_time
    }

    /// Submit `payload` for execution at `run_at` and index its handle.
    ///
    /// # Errors
    /// Only when the work queue refuses the submission. A failed job store
    /// write is logged and reported through `ScheduleAck::indexed`.
    pub async fn schedule(
        &self,
        kind: JobKind,
        entity_id: EntityId,
        run_at: DateTime<Utc>,
        payload: &TaskRef,
    ) -> Result<ScheduleAck> {
        let key = JobKey::new(kind, entity_id);

        let handle = match self.work_queue.submit(payload, run_at).await {
            Ok(handle) => handle,
            Err(e) => {
                let err = Failure::classify(Operation::Submit, e).into_error();
                error!(
                    key = %key,
                    run_at = %run_at,
                    class = err.class(),
                    error = %err,
                    "Work queue refused reminder; nothing scheduled"
                );
                return Err(err);
            }
        };

        let indexed = match self.job_store.set(&key, &handle).await {
            Ok(()) => true,
            Err(e) => {
                self.absorb(Operation::StoreWrite, &key, e)?;
                warn!(
                    key = %key,
                    handle = %handle,
                    "Job scheduled but not indexed; it cannot be revoked (orphaned)"
                );
                false
            }
        };

        info!(
            key = %key,
            handle = %handle,
            run_at = %run_at,
            indexed = indexed,
            "Job scheduled"
        );

        Ok(ScheduleAck {
            key,
            handle,
            run_at,
            indexed,
        })
    }

    /// Cancel the stored job for an entity, if any.
    ///
    /// Silent no-op when nothing is stored (never scheduled, already revoked,
    /// or the index write was lost).
    pub async fn revoke(&self, kind: JobKind, entity_id: EntityId) -> Result<RevokeAck> {
        let key = JobKey::new(kind, entity_id);

        let stored = match self.job_store.get(&key).await {
            Ok(stored) => stored,
            Err(e) => {
                self.absorb(Operation::StoreRead, &key, e)?;
                None
            }
        };

        let Some(handle) = stored else {
            debug!(key = %key, "No stored job; nothing to revoke");
            return Ok(RevokeAck::NothingScheduled);
        };

        let cancelled = match self.work_queue.cancel(&handle).await {
            Ok(()) => true,
            Err(e) => {
                self.absorb(Operation::Cancel, &key, e)?;
                false
            }
        };

        let unindexed = match self.job_store.delete(&key).await {
            Ok(_) => true,
            Err(e) => {
                self.absorb(Operation::StoreDelete, &key, e)?;
                false
            }
        };

        info!(
            key = %key,
            handle = %handle,
            cancelled = cancelled,
            unindexed = unindexed,
            "Job revoked"
        );

        Ok(RevokeAck::Revoked {
            handle,
            cancelled,
            unindexed,
        })
    }

    /// Replace the stored job after a deadline change.
    ///
    /// Deadlines are compared by value; an unchanged deadline touches nothing
    /// and returns `Ok(None)`. Otherwise the old job is revoked and a new one
    /// scheduled at `new_run_at - lead_time`.
    pub async fn reschedule(
        &self,
        kind: JobKind,
        entity_id: EntityId,
        old_run_at: DateTime<Utc>,
        new_run_at: DateTime<Utc>,
        payload: &TaskRef,
    ) -> Result<Option<ScheduleAck>> {
        if old_run_at == new_run_at {
            debug!(
                entity_id = %entity_id,
                deadline = %new_run_at,
                "Deadline unchanged; keeping current job"
            );
            return Ok(None);
        }

        let notify_at = self.notify_at(new_run_at);
        self.revoke(kind, entity_id).await?;
        self.schedule(kind, entity_id, notify_at, payload)
            .await
            .map(Some)
    }

    /// Schedule the deadline reminder of a task (`deadline - lead_time`)
    pub async fn schedule_reminder(
        &self,
        task_id: EntityId,
        deadline: DateTime<Utc>,
    ) -> Result<ScheduleAck> {
        self.schedule(
            JobKind::SendMail,
            task_id,
            self.notify_at(deadline),
            &TaskRef::deadline_notification(task_id),
        )
        .await
    }

    /// Move the deadline reminder of a task
    pub async fn reschedule_reminder(
        &self,
        task_id: EntityId,
        old_deadline: DateTime<Utc>,
        new_deadline: DateTime<Utc>,
    ) -> Result<Option<ScheduleAck>> {
        self.reschedule(
            JobKind::SendMail,
            task_id,
            old_deadline,
            new_deadline,
            &TaskRef::deadline_notification(task_id),
        )
        .await
    }

    /// Drop the deadline reminder of a task
    pub async fn revoke_reminder(&self, task_id: EntityId) -> Result<RevokeAck> {
        self.revoke(JobKind::SendMail, task_id).await
    }

    /// Swallow recoverable failures, propagate fatal ones
    fn absorb(&self, op: Operation, key: &JobKey, err: impl Into<AppError>) -> Result<()> {
        match Failure::classify(op, err) {
            Failure::Recoverable(err) => {
                warn!(
                    operation = %op,
                    key = %key,
                    class = err.class(),
                    error = %err,
                    "Recoverable failure; continuing"
                );
                Ok(())
            }
            Failure::Fatal(err) => Err(err),
        }
    }
}
