//! Behaviour with one dependency down
//!
//! Task mutations must survive a lost job store, a failing broker and a
//! failing mail relay; only a refused submission is surfaced.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use todocore_core::application::scheduler::DEFAULT_LEAD_TIME;
use todocore_core::application::{
    BrokerProbe, ChatAlerter, DeadlineReminderHandler, DeliveryReport, EmailNotifier,
    EventPublisher, HandlerRegistry, HealthProber, JobStoreProbe, Probe, RevokeAck, Scheduler,
    TaskLifecycle, Worker,
};
use todocore_core::domain::{
    DependencyStatus, EntityRef, EventEnvelope, EventName, EventType, QueuedJobState, TaskRecord,
    Topic, UserRecord,
};
use todocore_core::port::broker::mocks::{MockBehavior, MockBroker};
use todocore_core::port::id_provider::mocks::SequentialIdProvider;
use todocore_core::port::job_store::mocks::InMemoryJobStore;
use todocore_core::port::notifier::mocks::{RecordingChatBot, RecordingMailTransport};
use todocore_core::port::task_directory::mocks::InMemoryTaskDirectory;
use todocore_core::port::time_provider::mocks::ManualClock;
use todocore_core::port::QueueBackend;
use todocore_core::AppError;
use todocore_infra_sqlite::{create_pool, run_migrations, SqliteWorkQueue};
use uuid::Uuid;

async fn sqlite_queue(clock: Arc<ManualClock>) -> Arc<SqliteWorkQueue> {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(SqliteWorkQueue::new(
        pool,
        clock,
        Arc::new(SequentialIdProvider::new("job")),
    ))
}

fn task(deadline: DateTime<Utc>) -> TaskRecord {
    TaskRecord {
        id: Uuid::new_v4(),
        title: "Renew certificate".to_string(),
        description: String::new(),
        deadline,
        status: "todo".to_string(),
        assignee: EntityRef::Resolved(UserRecord {
            id: Uuid::new_v4(),
            email: Some("ops@todo.test".to_string()),
        }),
        project: EntityRef::Id(Uuid::new_v4()),
        created_by: None,
        created_at: None,
        updated_at: None,
    }
}

#[tokio::test]
async fn test_unindexed_reminder_still_fires_but_cannot_be_revoked() {
    let start = Utc.with_ymd_and_hms(2031, 7, 1, 8, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::at(start));
    let queue = sqlite_queue(clock.clone()).await;
    let store = Arc::new(InMemoryJobStore::new());
    let scheduler = Scheduler::new(queue.clone(), store.clone(), DEFAULT_LEAD_TIME);
    let task = task(Utc.with_ymd_and_hms(2031, 7, 1, 12, 0, 0).unwrap());

    store.set_unreachable(true);
    let ack = scheduler.schedule_reminder(task.id, task.deadline).await.unwrap();
    assert!(!ack.indexed);

    // store is back, but it never learned the handle
    store.set_unreachable(false);
    let revoke = scheduler.revoke_reminder(task.id).await.unwrap();
    assert_eq!(revoke, RevokeAck::NothingScheduled);

    let job = queue.find(&ack.handle).await.unwrap().unwrap();
    assert_eq!(job.state, QueuedJobState::Queued);

    let directory = Arc::new(InMemoryTaskDirectory::new());
    directory.insert(task.clone());
    let mail = Arc::new(RecordingMailTransport::new());
    let handlers = HandlerRegistry::new().register(Arc::new(DeadlineReminderHandler::new(
        directory,
        Arc::new(EmailNotifier::new(mail.clone(), "noreply@todo.test")),
    )));
    let worker = Worker::new(queue, handlers, clock.clone());

    clock.set(ack.run_at);
    assert!(worker.process_next_job().await.unwrap());
    assert_eq!(mail.sent().len(), 1);
}

#[tokio::test]
async fn test_revoke_with_store_down_is_a_no_op() {
    let start = Utc.with_ymd_and_hms(2031, 7, 1, 8, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::at(start));
    let queue = sqlite_queue(clock).await;
    let store = Arc::new(InMemoryJobStore::new());
    let scheduler = Scheduler::new(queue.clone(), store.clone(), DEFAULT_LEAD_TIME);
    let task = task(Utc.with_ymd_and_hms(2031, 7, 1, 12, 0, 0).unwrap());

    let ack = scheduler.schedule_reminder(task.id, task.deadline).await.unwrap();
    store.set_unreachable(true);

    let revoke = scheduler.revoke_reminder(task.id).await.unwrap();

    assert_eq!(revoke, RevokeAck::NothingScheduled);
    let job = queue.find(&ack.handle).await.unwrap().unwrap();
    assert_eq!(job.state, QueuedJobState::Queued);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_closed_queue_fails_creation_without_event() {
    let start = Utc.with_ymd_and_hms(2031, 7, 1, 8, 0, 0).unwrap();
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    let queue = Arc::new(SqliteWorkQueue::new(
        pool.clone(),
        Arc::new(ManualClock::at(start)),
        Arc::new(SequentialIdProvider::new("job")),
    ));
    let store = Arc::new(InMemoryJobStore::new());
    let broker = Arc::new(MockBroker::accepting());
    let lifecycle = TaskLifecycle::new(
        Arc::new(Scheduler::new(queue, store.clone(), DEFAULT_LEAD_TIME)),
        Arc::new(EventPublisher::new(broker.clone())),
    );
    pool.close().await;

    let result = lifecycle
        .on_created(&task(Utc.with_ymd_and_hms(2031, 7, 1, 12, 0, 0).unwrap()))
        .await;

    assert!(matches!(result, Err(AppError::Queue(_))));
    assert!(store.is_empty());
    assert!(broker.published().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_send_event_survives_every_broker_failure() {
    let broker = Arc::new(MockBroker::accepting());
    let publisher = EventPublisher::new(broker.clone()).with_flush_timeout(Duration::from_secs(5));
    let envelope = || {
        EventEnvelope::builder(EventName::Update.with_noun("task"), "Task")
            .event_type(EventType::Model)
            .entity_id(Uuid::new_v4())
            .build()
    };

    let failures = [
        MockBehavior::Timeout,
        MockBehavior::AllBrokersDown,
        MockBehavior::ConnectionError,
        MockBehavior::Hang,
    ];
    for behavior in failures {
        broker.set_behavior(behavior.clone());
        let report = publisher.send_event(Topic::ModelsTopic, envelope()).await;
        assert!(matches!(report, DeliveryReport::Dropped { .. }), "{:?}", behavior);
    }
    assert!(broker.published().is_empty());

    broker.set_behavior(MockBehavior::Accept);
    let report = publisher.send_event(Topic::ModelsTopic, envelope()).await;
    assert_eq!(report, DeliveryReport::Delivered);
    assert_eq!(broker.published().len(), 1);
}

#[tokio::test]
async fn test_mail_outage_completes_reminder_job() {
    let start = Utc.with_ymd_and_hms(2031, 7, 1, 8, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::at(start));
    let queue = sqlite_queue(clock.clone()).await;
    let scheduler = Scheduler::new(queue.clone(), Arc::new(InMemoryJobStore::new()), DEFAULT_LEAD_TIME);
    let task = task(Utc.with_ymd_and_hms(2031, 7, 1, 9, 0, 0).unwrap());
    let ack = scheduler.schedule_reminder(task.id, task.deadline).await.unwrap();

    let directory = Arc::new(InMemoryTaskDirectory::new());
    directory.insert(task);
    let handlers = HandlerRegistry::new().register(Arc::new(DeadlineReminderHandler::new(
        directory,
        Arc::new(EmailNotifier::new(
            Arc::new(RecordingMailTransport::failing()),
            "noreply@todo.test",
        )),
    )));
    let worker = Worker::new(queue.clone(), handlers, clock);

    assert!(worker.process_next_job().await.unwrap());

    let job = queue.find(&ack.handle).await.unwrap().unwrap();
    assert_eq!(job.state, QueuedJobState::Done);
}

#[tokio::test]
async fn test_health_cycle_reports_down_store_and_broker() {
    let store = Arc::new(InMemoryJobStore::new());
    let broker = Arc::new(MockBroker::accepting());
    let bot = Arc::new(RecordingChatBot::new());
    let probes: Vec<Arc<dyn Probe>> = vec![
        Arc::new(JobStoreProbe::new(store.clone())),
        Arc::new(BrokerProbe::new(broker.clone())),
    ];
    let prober = HealthProber::new(probes, ChatAlerter::new(bot.clone()));

    let healthy = prober.run_once().await;
    assert!(healthy.all_up());

    store.set_unreachable(true);
    broker.set_behavior(MockBehavior::AllBrokersDown);
    let degraded = prober.run_once().await;

    assert!(matches!(degraded.status("job_store"), Some(DependencyStatus::Down(_))));
    assert!(matches!(degraded.status("broker"), Some(DependencyStatus::Down(_))));
    assert_eq!(bot.texts().len(), 2);
}
