// Task snapshot used by reminder e-mails and event payloads

use crate::domain::job::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Anything carrying an entity id
pub trait Identified {
    fn id(&self) -> EntityId;
}

/// Reference that is either a raw identifier or an already resolved record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EntityRef<R> {
    Id(EntityId),
    Resolved(R),
}

impl<R: Identified> EntityRef<R> {
    /// Identifier of the referenced entity, whichever variant holds it
    pub fn id(&self) -> EntityId {
        match self {
            EntityRef::Id(id) => *id,
            EntityRef::Resolved(record) => record.id(),
        }
    }

    pub fn resolved(&self) -> Option<&R> {
        match self {
            EntityRef::Id(_) => None,
            EntityRef::Resolved(record) => Some(record),
        }
    }
}

impl<R> From<EntityId> for EntityRef<R> {
    fn from(id: EntityId) -> Self {
        EntityRef::Id(id)
    }
}

// Snapshots stay flat: a reference always renders as its id.
impl<R: Identified> Serialize for EntityRef<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id().serialize(serializer)
    }
}

/// User as seen by the notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: EntityId,
    pub email: Option<String>,
}

impl Identified for UserRecord {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Project reference target (only the id matters to the notifier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: EntityId,
    pub name: Option<String>,
}

impl Identified for ProjectRecord {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Task with a deadline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub status: String,
    pub assignee: EntityRef<UserRecord>,
    pub project: EntityRef<ProjectRecord>,
    pub created_by: Option<EntityRef<UserRecord>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Assignee e-mail, when the reference has been resolved and carries one
    pub fn assignee_email(&self) -> Option<&str> {
        self.assignee
            .resolved()
            .and_then(|user| user.email.as_deref())
    }
}

impl Identified for TaskRecord {
    fn id(&self) -> EntityId {
        self.id
    }
}
