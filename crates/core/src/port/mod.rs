// Port Layer - Interfaces for external dependencies

pub mod broker;
pub mod id_provider; // For deterministic testing
pub mod job_store;
pub mod notifier;
pub mod task_directory;
pub mod time_provider;
pub mod work_queue;

// Re-exports
pub use broker::{BrokerClient, BrokerError};
pub use id_provider::IdProvider;
pub use job_store::{JobStore, StoreError};
pub use notifier::{ChatBot, EmailMessage, MailTransport, NotifyError};
pub use task_directory::TaskDirectory;
pub use time_provider::TimeProvider;
pub use work_queue::{QueueBackend, QueueError, WorkQueue};
