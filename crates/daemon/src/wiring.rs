// Construction of configured application services

use crate::settings::AppConfig;
use std::sync::Arc;
use todocore_core::application::{EventPublisher, Scheduler, TaskLifecycle};
use todocore_core::port::{BrokerClient, JobStore, WorkQueue};

/// Scheduler using the configured reminder lead time
pub fn scheduler(
    config: &AppConfig,
    work_queue: Arc<dyn WorkQueue>,
    job_store: Arc<dyn JobStore>,
) -> Scheduler {
    Scheduler::new(work_queue, job_store, config.lead_time())
}

/// Publisher using the configured flush timeout and partition key
pub fn publisher(config: &AppConfig, broker: Arc<dyn BrokerClient>) -> EventPublisher {
    EventPublisher::new(broker)
        .with_flush_timeout(config.flush_timeout())
        .with_partition_key(config.broker.partition_key.clone())
}

pub fn task_lifecycle(
    config: &AppConfig,
    work_queue: Arc<dyn WorkQueue>,
    job_store: Arc<dyn JobStore>,
    broker: Arc<dyn BrokerClient>,
) -> TaskLifecycle {
    TaskLifecycle::new(
        Arc::new(scheduler(config, work_queue, job_store)),
        Arc::new(publisher(config, broker)),
    )
}
