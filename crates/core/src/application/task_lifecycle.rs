// Task Lifecycle - reminder scheduling plus change events for task CRUD
//
// Called by the CRUD collaborator after each persisted mutation.

use crate::application::events::{DeliveryReport, EventPublisher};
use crate::application::scheduler::{RevokeAck, ScheduleAck, Scheduler};
use crate::domain::event::record_snapshot;
use crate::domain::{EntityId, EventEnvelope, EventName, EventType, TaskRecord, Topic};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

const TASK_NOUN: &str = "task";
const TASK_MODEL: &str = "Task";
const MEMBERSHIP_MODEL: &str = "ProjectUser";

/// Outcome of a lifecycle hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleReport<A> {
    pub scheduling: A,
    pub delivery: DeliveryReport,
}

pub struct TaskLifecycle {
    scheduler: Arc<Scheduler>,
    publisher: Arc<EventPublisher>,
}

impl TaskLifecycle {
    pub fn new(scheduler: Arc<Scheduler>, publisher: Arc<EventPublisher>) -> Self {
        Self {
            scheduler,
            publisher,
        }
    }

    /// Schedule the reminder of a new task, then announce it.
    ///
    /// # Errors
    /// When the reminder could not be submitted; no event is sent then.
    pub async fn on_created(&self, task: &TaskRecord) -> Result<LifecycleReport<ScheduleAck>> {
        let scheduling = self.scheduler.schedule_reminder(task.id, task.deadline).await?;
        let delivery = self.publish_task(EventName::Create, task).await;
        Ok(LifecycleReport {
            scheduling,
            delivery,
        })
    }

    /// Move the reminder if the deadline changed, then announce the update
    pub async fn on_updated(
        &self,
        old_deadline: DateTime<Utc>,
        task: &TaskRecord,
    ) -> Result<LifecycleReport<Option<ScheduleAck>>> {
        let scheduling = self
            .scheduler
            .reschedule_reminder(task.id, old_deadline, task.deadline)
            .await?;
        let delivery = self.publish_task(EventName::Update, task).await;
        Ok(LifecycleReport {
            scheduling,
            delivery,
        })
    }

    /// Drop the reminder of a deleted task, then announce the deletion
    pub async fn on_deleted(&self, task_id: EntityId) -> Result<LifecycleReport<RevokeAck>> {
        let scheduling = self.scheduler.revoke_reminder(task_id).await?;
        let envelope = EventEnvelope::builder(EventName::Delete.with_noun(TASK_NOUN), TASK_MODEL)
            .event_type(EventType::Model)
            .entity_id(task_id)
            .build();
        let delivery = self.publisher.send_event(Topic::ModelsTopic, envelope).await;
        Ok(LifecycleReport {
            scheduling,
            delivery,
        })
    }

    /// Announce a project membership change on the events topic
    pub async fn on_project_membership(
        &self,
        event: EventName,
        membership_id: EntityId,
        snapshot: Option<Value>,
    ) -> DeliveryReport {
        let envelope = EventEnvelope::builder(event.as_str(), MEMBERSHIP_MODEL)
            .event_type(EventType::Event)
            .model_data(snapshot)
            .entity_id(membership_id)
            .build();
        self.publisher.send_event(Topic::EventsTopic, envelope).await
    }

    async fn publish_task(&self, name: EventName, task: &TaskRecord) -> DeliveryReport {
        let snapshot = match record_snapshot(task) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Task snapshot unavailable; sending without model data");
                None
            }
        };
        let envelope = EventEnvelope::builder(name.with_noun(TASK_NOUN), TASK_MODEL)
            .event_type(EventType::Model)
            .model_data(snapshot)
            .entity_id(task.id)
            .build();
        self.publisher.send_event(Topic::ModelsTopic, envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scheduler::DEFAULT_LEAD_TIME;
    use crate::domain::{EntityRef, JobKey, JobKind};
    use crate::port::broker::mocks::{MockBehavior, MockBroker};
    use crate::port::job_store::mocks::InMemoryJobStore;
    use crate::port::work_queue::mocks::InMemoryWorkQueue;
    use chrono::TimeZone;
    use uuid::Uuid;

    struct Fixture {
        queue: Arc<InMemoryWorkQueue>,
        store: Arc<InMemoryJobStore>,
        broker: Arc<MockBroker>,
        lifecycle: TaskLifecycle,
    }

    fn fixture() -> Fixture {
        let queue = Arc::new(InMemoryWorkQueue::new());
        let store = Arc::new(InMemoryJobStore::new());
        let broker = Arc::new(MockBroker::accepting());
        let scheduler = Arc::new(Scheduler::new(queue.clone(), store.clone(), DEFAULT_LEAD_TIME));
        let publisher = Arc::new(EventPublisher::new(broker.clone()));
        Fixture {
            queue,
            store,
            broker,
            lifecycle: TaskLifecycle::new(scheduler, publisher),
        }
    }

    fn task(deadline: DateTime<Utc>) -> TaskRecord {
        TaskRecord {
            id: Uuid::new_v4(),
            title: "Write docs".to_string(),
            description: "API reference".to_string(),
            deadline,
            status: "todo".to_string(),
            assignee: EntityRef::Id(Uuid::new_v4()),
            project: EntityRef::Id(Uuid::new_v4()),
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn published_names(broker: &MockBroker) -> Vec<String> {
        broker
            .published()
            .iter()
            .map(|m| EventEnvelope::from_slice(&m.value).unwrap().event_name().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_created_schedules_and_publishes() {
        let f = fixture();
        let deadline = Utc.with_ymd_and_hms(2031, 3, 1, 10, 0, 0).unwrap();
        let task = task(deadline);

        let report = f.lifecycle.on_created(&task).await.unwrap();

        assert_eq!(report.scheduling.run_at, deadline - DEFAULT_LEAD_TIME);
        assert!(report.delivery.is_delivered());
        assert_eq!(published_names(&f.broker), vec!["create_task"]);

        let message = &f.broker.published()[0];
        let envelope = EventEnvelope::from_slice(&message.value).unwrap();
        assert_eq!(message.topic, "models_topic");
        assert_eq!(envelope.event_type(), "MODEL");
        assert_eq!(envelope.model_type(), "Task");
        assert_eq!(envelope.entity_id(), Some(task.id.to_string().as_str()));
        assert_eq!(envelope.model_data().unwrap()["title"], "Write docs");
    }

    #[tokio::test]
    async fn test_created_with_queue_down_sends_nothing() {
        let f = fixture();
        f.queue.set_unavailable(true);

        let result = f.lifecycle.on_created(&task(Utc::now())).await;

        assert!(result.is_err());
        assert!(f.broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_updated_moves_reminder() {
        let f = fixture();
        let d1 = Utc.with_ymd_and_hms(2031, 3, 1, 10, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2031, 3, 2, 10, 0, 0).unwrap();
        let mut task = task(d1);
        let first = f.lifecycle.on_created(&task).await.unwrap().scheduling;

        task.deadline = d2;
        let report = f.lifecycle.on_updated(d1, &task).await.unwrap();
        let second = report.scheduling.expect("deadline changed");

        assert_ne!(first.handle, second.handle);
        assert_eq!(f.queue.cancelled(), vec![first.handle]);
        let key = JobKey::new(JobKind::SendMail, task.id).storage_key();
        assert_eq!(f.store.get_raw(&key), Some(second.handle));
        assert_eq!(published_names(&f.broker), vec!["create_task", "update_task"]);
    }

    #[tokio::test]
    async fn test_updated_same_deadline_still_publishes() {
        let f = fixture();
        let task = task(Utc.with_ymd_and_hms(2031, 3, 1, 10, 0, 0).unwrap());

        let report = f.lifecycle.on_updated(task.deadline, &task).await.unwrap();

        assert!(report.scheduling.is_none());
        assert_eq!(f.queue.submit_count(), 0);
        assert_eq!(published_names(&f.broker), vec!["update_task"]);
    }

    #[tokio::test]
    async fn test_deleted_revokes_and_publishes_without_data() {
        let f = fixture();
        let task = task(Utc.with_ymd_and_hms(2031, 3, 1, 10, 0, 0).unwrap());
        f.lifecycle.on_created(&task).await.unwrap();

        let report = f.lifecycle.on_deleted(task.id).await.unwrap();

        assert!(matches!(report.scheduling, RevokeAck::Revoked { .. }));
        assert!(f.store.is_empty());
        let last = f.broker.published().pop().unwrap();
        let envelope = EventEnvelope::from_slice(&last.value).unwrap();
        assert_eq!(envelope.event_name(), "delete_task");
        assert!(envelope.model_data().is_none());
    }

    #[tokio::test]
    async fn test_broker_down_does_not_fail_mutation() {
        let f = fixture();
        f.broker.set_behavior(MockBehavior::AllBrokersDown);

        let report = f
            .lifecycle
            .on_created(&task(Utc.with_ymd_and_hms(2031, 3, 1, 10, 0, 0).unwrap()))
            .await
            .unwrap();

        assert!(!report.delivery.is_delivered());
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_membership_event_goes_to_events_topic() {
        let f = fixture();
        let membership = Uuid::new_v4();

        let report = f
            .lifecycle
            .on_project_membership(EventName::AddOnProject, membership, None)
            .await;

        assert!(report.is_delivered());
        let message = &f.broker.published()[0];
        assert_eq!(message.topic, "events_topic");
        let envelope = EventEnvelope::from_slice(&message.value).unwrap();
        assert_eq!(envelope.event_name(), "add_on_project");
        assert_eq!(envelope.event_type(), "EVENT");
        assert_eq!(envelope.model_type(), "ProjectUser");
    }
}
