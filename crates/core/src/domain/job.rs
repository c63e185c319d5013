// Job Domain Model
//
// Scheduler side: JobKind / JobKey / JobHandle name "the job that currently
// represents an entity". Queue side: QueuedJob is one deferred execution held
// by the work queue.

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity identifier (every domain entity has a UUID primary key)
pub type EntityId = Uuid;

/// Callable reference of the deadline reminder job body
pub const SEND_DEADLINE_NOTIFICATION: &str = "task.send_deadline_notification";

/// Family of deferred jobs an entity can own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    #[default]
    SendMail,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::SendMail => "send_mail",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job Store key: one per `(job_kind, entity_id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    kind: JobKind,
    entity_id: EntityId,
}

impl JobKey {
    pub fn new(kind: JobKind, entity_id: EntityId) -> Self {
        Self { kind, entity_id }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Storage key, e.g. `task: send_mail: 6f1c…`
    pub fn storage_key(&self) -> String {
        format!("task: {}: {}", self.kind, self.entity_id)
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Opaque handle issued by the work queue for one submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Reference to a job body plus the arguments it re-resolves at execution time.
///
/// Arguments are identifiers, never live objects: execution happens later and
/// possibly in another process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub name: String,
    pub args: Vec<String>,
}

impl TaskRef {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Deadline reminder for one task entity
    pub fn deadline_notification(entity_id: EntityId) -> Self {
        Self::new(SEND_DEADLINE_NOTIFICATION, vec![entity_id.to_string()])
    }

    /// Parse the first argument as an entity id
    pub fn entity_arg(&self) -> Result<EntityId> {
        let raw = self
            .args
            .first()
            .ok_or_else(|| DomainError::InvalidArguments {
                task: self.name.clone(),
                reason: "missing entity id".to_string(),
            })?;
        Uuid::parse_str(raw).map_err(|e| DomainError::InvalidArguments {
            task: self.name.clone(),
            reason: format!("{}: {}", raw, e),
        })
    }
}

/// State of a job inside the work queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueuedJobState {
    Queued,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl QueuedJobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueuedJobState::Done | QueuedJobState::Failed | QueuedJobState::Cancelled
        )
    }
}

impl std::fmt::Display for QueuedJobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueuedJobState::Queued => write!(f, "QUEUED"),
            QueuedJobState::Running => write!(f, "RUNNING"),
            QueuedJobState::Done => write!(f, "DONE"),
            QueuedJobState::Failed => write!(f, "FAILED"),
            QueuedJobState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl std::str::FromStr for QueuedJobState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "QUEUED" => Ok(QueuedJobState::Queued),
            "RUNNING" => Ok(QueuedJobState::Running),
            "DONE" => Ok(QueuedJobState::Done),
            "FAILED" => Ok(QueuedJobState::Failed),
            "CANCELLED" => Ok(QueuedJobState::Cancelled),
            other => Err(DomainError::UnknownState(other.to_string())),
        }
    }
}

/// One deferred execution held by the work queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub handle: JobHandle,
    pub task: TaskRef,
    pub state: QueuedJobState,

    pub eta: i64,        // epoch ms, not before
    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,

    pub attempts: i32,
    pub last_error: Option<String>,
}

impl QueuedJob {
    /// Create a queued job
    ///
    /// # Arguments
    ///
    /// * `handle` - Handle returned to the submitter (injected, not generated)
    /// * `task` - Job body reference and arguments
    /// * `eta` - Earliest execution time in epoch ms
    /// * `created_at` - Submission timestamp in epoch ms (injected, not system time)
    pub fn new(handle: JobHandle, task: TaskRef, eta: i64, created_at: i64) -> Self {
        Self {
            handle,
            task,
            state: QueuedJobState::Queued,
            eta,
            created_at,
            started_at: None,
            finished_at: None,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn is_due(&self, now_millis: i64) -> bool {
        self.state == QueuedJobState::Queued && self.eta <= now_millis
    }

    /// Transition to Running state with explicit timestamp
    pub fn start(&mut self, now_millis: i64) -> Result<()> {
        if self.state != QueuedJobState::Queued {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: QueuedJobState::Running.to_string(),
            });
        }
        self.state = QueuedJobState::Running;
        self.started_at = Some(now_millis);
        self.attempts += 1;
        Ok(())
    }

    /// Transition to Done state with explicit timestamp
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        if self.state != QueuedJobState::Running {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: QueuedJobState::Done.to_string(),
            });
        }
        self.state = QueuedJobState::Done;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Mark as Failed with explicit timestamp
    pub fn fail(&mut self, now_millis: i64, reason: impl Into<String>) {
        self.state = QueuedJobState::Failed;
        self.finished_at = Some(now_millis);
        self.last_error = Some(reason.into());
    }

    /// Cancel a job that has not started yet.
    ///
    /// Returns false (and leaves the job untouched) for any other state.
    pub fn cancel(&mut self, now_millis: i64) -> bool {
        if self.state != QueuedJobState::Queued {
            return false;
        }
        self.state = QueuedJobState::Cancelled;
        self.finished_at = Some(now_millis);
        true
    }
}
