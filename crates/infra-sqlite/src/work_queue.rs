// SQLite Work Queue Implementation

use crate::error::{map_queue_error, map_sqlx_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use todocore_core::domain::{JobHandle, QueuedJob, QueuedJobState, TaskRef};
use todocore_core::error::{AppError, Result};
use todocore_core::port::{IdProvider, QueueBackend, QueueError, TimeProvider, WorkQueue};
use tracing::debug;

/// Deferred executor backed by the `queued_jobs` table
pub struct SqliteWorkQueue {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl SqliteWorkQueue {
    pub fn new(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            pool,
            time_provider,
            id_provider,
        }
    }
}

#[async_trait]
impl WorkQueue for SqliteWorkQueue {
    async fn submit(
        &self,
        task: &TaskRef,
        eta: DateTime<Utc>,
    ) -> std::result::Result<JobHandle, QueueError> {
        let handle = JobHandle::new(self.id_provider.generate_id());
        let args = serde_json::to_string(&task.args)
            .map_err(|e| QueueError::Rejected(format!("unserializable args: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO queued_jobs (id, task_name, args, state, eta, created_at, attempts)
            VALUES (?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(handle.as_str())
        .bind(&task.name)
        .bind(&args)
        .bind(QueuedJobState::Queued.to_string())
        .bind(eta.timestamp_millis())
        .bind(self.time_provider.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_queue_error)?;

        debug!(handle = %handle, task_name = %task.name, eta = %eta, "Job submitted");
        Ok(handle)
    }

    async fn cancel(&self, handle: &JobHandle) -> std::result::Result<(), QueueError> {
        // Conditional update: running, finished and unknown jobs are left alone
        let result = sqlx::query(
            r#"
            UPDATE queued_jobs
            SET state = ?, finished_at = ?
            WHERE id = ? AND state = ?
            "#,
        )
        .bind(QueuedJobState::Cancelled.to_string())
        .bind(self.time_provider.now_millis())
        .bind(handle.as_str())
        .bind(QueuedJobState::Queued.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_queue_error)?;

        if result.rows_affected() == 0 {
            debug!(handle = %handle, "Cancel ignored: job not pending");
        }
        Ok(())
    }
}

#[async_trait]
impl QueueBackend for SqliteWorkQueue {
    async fn pop_due(&self, now_millis: i64) -> Result<Option<QueuedJob>> {
        let row = sqlx::query_as::<_, QueuedJobRow>(
            r#"
            UPDATE queued_jobs
            SET state = ?, started_at = ?, attempts = attempts + 1
            WHERE id = (
                SELECT id FROM queued_jobs
                WHERE state = ? AND eta <= ?
                ORDER BY eta ASC, created_at ASC, id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(QueuedJobState::Running.to_string())
        .bind(now_millis)
        .bind(QueuedJobState::Queued.to_string())
        .bind(now_millis)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(QueuedJobRow::into_job).transpose()
    }

    async fn find(&self, handle: &JobHandle) -> Result<Option<QueuedJob>> {
        let row = sqlx::query_as::<_, QueuedJobRow>("SELECT * FROM queued_jobs WHERE id = ?")
            .bind(handle.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(QueuedJobRow::into_job).transpose()
    }

    async fn find_by_state(&self, state: QueuedJobState) -> Result<Vec<QueuedJob>> {
        let rows: Vec<QueuedJobRow> = sqlx::query_as(
            r#"
            SELECT * FROM queued_jobs
            WHERE state = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(state.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(QueuedJobRow::into_job).collect()
    }

    async fn update(&self, job: &QueuedJob) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE queued_jobs
            SET state = ?, started_at = ?, finished_at = ?, attempts = ?, last_error = ?
            WHERE id = ?
            "#,
        )
        .bind(job.state.to_string())
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.attempts)
        .bind(&job.last_error)
        .bind(job.handle.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {} not found", job.handle)));
        }
        Ok(())
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct QueuedJobRow {
    id: String,
    task_name: String,
    args: String,
    state: String,
    eta: i64,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
    attempts: i32,
    last_error: Option<String>,
}

impl QueuedJobRow {
    fn into_job(self) -> Result<QueuedJob> {
        let state: QueuedJobState = self.state.parse()?;
        let args: Vec<String> = serde_json::from_str(&self.args)?;

        Ok(QueuedJob {
            handle: JobHandle::new(self.id),
            task: TaskRef::new(self.task_name, args),
            state,
            eta: self.eta,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            attempts: self.attempts,
            last_error: self.last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use todocore_core::port::id_provider::mocks::SequentialIdProvider;
    use todocore_core::port::time_provider::mocks::ManualClock;

    const T0: i64 = 1_900_000_000_000;

    async fn setup_queue() -> (SqliteWorkQueue, Arc<ManualClock>) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let queue = SqliteWorkQueue::new(
            pool,
            clock.clone(),
            Arc::new(SequentialIdProvider::new("job")),
        );
        (queue, clock)
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn reminder() -> TaskRef {
        TaskRef::deadline_notification(uuid::Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_submit_and_find() {
        let (queue, _) = setup_queue().await;
        let task = reminder();

        let handle = queue.submit(&task, at(T0 + 60_000)).await.unwrap();
        assert_eq!(handle.as_str(), "job-1");

        let job = queue.find(&handle).await.unwrap().unwrap();
        assert_eq!(job.task, task);
        assert_eq!(job.state, QueuedJobState::Queued);
        assert_eq!(job.eta, T0 + 60_000);
        assert_eq!(job.created_at, T0);
    }

    #[tokio::test]
    async fn test_pop_due_respects_eta_order() {
        let (queue, _) = setup_queue().await;
        let later = queue.submit(&reminder(), at(T0 + 2_000)).await.unwrap();
        let sooner = queue.submit(&reminder(), at(T0 + 1_000)).await.unwrap();

        assert!(queue.pop_due(T0).await.unwrap().is_none());

        let first = queue.pop_due(T0 + 5_000).await.unwrap().unwrap();
        assert_eq!(first.handle, sooner);
        assert_eq!(first.state, QueuedJobState::Running);
        assert_eq!(first.attempts, 1);
        assert_eq!(first.started_at, Some(T0 + 5_000));

        let second = queue.pop_due(T0 + 5_000).await.unwrap().unwrap();
        assert_eq!(second.handle, later);
        assert!(queue.pop_due(T0 + 5_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (queue, _) = setup_queue().await;
        let handle = queue.submit(&reminder(), at(T0)).await.unwrap();

        queue.cancel(&handle).await.unwrap();
        queue.cancel(&handle).await.unwrap();
        queue.cancel(&JobHandle::new("unknown")).await.unwrap();

        let job = queue.find(&handle).await.unwrap().unwrap();
        assert_eq!(job.state, QueuedJobState::Cancelled);
        assert!(queue.pop_due(T0 + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_leaves_running_job_alone() {
        let (queue, _) = setup_queue().await;
        let handle = queue.submit(&reminder(), at(T0)).await.unwrap();
        queue.pop_due(T0).await.unwrap();

        queue.cancel(&handle).await.unwrap();

        let job = queue.find(&handle).await.unwrap().unwrap();
        assert_eq!(job.state, QueuedJobState::Running);
    }

    #[tokio::test]
    async fn test_update_persists_outcome() {
        let (queue, _) = setup_queue().await;
        queue.submit(&reminder(), at(T0)).await.unwrap();
        let mut job = queue.pop_due(T0).await.unwrap().unwrap();

        job.fail(T0 + 10, "smtp down");
        queue.update(&job).await.unwrap();

        let failed = queue.find_by_state(QueuedJobState::Failed).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].last_error.as_deref(), Some("smtp down"));
        assert_eq!(failed[0].finished_at, Some(T0 + 10));
    }

    #[tokio::test]
    async fn test_update_unknown_job_is_not_found() {
        let (queue, _) = setup_queue().await;
        let ghost = QueuedJob::new(JobHandle::new("ghost"), reminder(), T0, T0);

        let result = queue.update(&ghost).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let (queue, _) = setup_queue().await;
        queue.pool.close().await;

        let result = queue.submit(&reminder(), at(T0)).await;
        assert!(matches!(result, Err(QueueError::Unavailable(_))));
    }
}
