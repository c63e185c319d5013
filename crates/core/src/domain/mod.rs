// Domain Layer - Pure business logic and entities

pub mod error;
pub mod event;
pub mod health;
pub mod job;
pub mod task;

// Re-exports
pub use error::DomainError;
pub use event::{EventEnvelope, EventName, EventType, Topic, DEFAULT_RECEIVER};
pub use health::{DependencyStatus, HealthState};
pub use job::{
    EntityId, JobHandle, JobKey, JobKind, QueuedJob, QueuedJobState, TaskRef,
    SEND_DEADLINE_NOTIFICATION,
};
pub use task::{EntityRef, Identified, ProjectRecord, TaskRecord, UserRecord};
