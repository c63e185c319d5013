// Application Layer - Use Cases

pub mod events;
pub mod health;
pub mod notifications;
pub mod recovery;
pub mod reminder;
pub mod scheduler;
pub mod task_lifecycle;
pub mod worker;

// Re-exports
pub use events::{DeliveryReport, EventPublisher};
pub use health::{AlertPolicy, BrokerProbe, HealthProber, JobStoreProbe, Probe};
pub use notifications::{ChatAlerter, EmailNotifier};
pub use recovery::RecoveryService;
pub use reminder::{DeadlineReminderHandler, HandlerRegistry, JobHandler};
pub use scheduler::{RevokeAck, ScheduleAck, Scheduler};
pub use task_lifecycle::{LifecycleReport, TaskLifecycle};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
