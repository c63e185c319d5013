// Event Publisher - best-effort delivery of domain events
//
// Every failure mode of the broker ends in a DeliveryReport; nothing here
// returns an error or blocks past the flush timeout.

use crate::domain::{EventEnvelope, Topic};
use crate::error::AppError;
use crate::port::{BrokerClient, BrokerError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Partition key shared by every message
pub const DEFAULT_PARTITION_KEY: &str = "MESSAGE_KEY";

/// Upper bound on one publish round trip
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one `send_event` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReport {
    Delivered,
    /// Logged and dropped; `class` is the error class of the failure
    Dropped { class: &'static str },
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryReport::Delivered)
    }
}

/// Publishes envelopes to topics through a shared broker client
pub struct EventPublisher {
    broker: Arc<dyn BrokerClient>,
    partition_key: String,
    flush_timeout: Duration,
}

impl EventPublisher {
    pub fn new(broker: Arc<dyn BrokerClient>) -> Self {
        Self {
            broker,
            partition_key: DEFAULT_PARTITION_KEY.to_string(),
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = key.into();
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// Serialize and publish `envelope` to `topic`.
    ///
    /// Never fails: timeouts, unavailable brokers, connection and
    /// serialization errors are logged with topic and error class and
    /// reported as `Dropped`.
    pub async fn send_event(&self, topic: Topic, envelope: EventEnvelope) -> DeliveryReport {
        let outcome = match envelope.to_bytes() {
            Ok(bytes) => self.publish(topic, &bytes).await,
            Err(e) => Err(BrokerError::Serialization(e.to_string())),
        };

        match outcome {
            Ok(()) => {
                debug!(
                    topic = %topic,
                    event_name = envelope.event_name(),
                    entity_id = envelope.entity_id().unwrap_or("-"),
                    "Event delivered"
                );
                DeliveryReport::Delivered
            }
            Err(e) => self.drop_event(topic, &envelope, e),
        }
    }

    async fn publish(&self, topic: Topic, bytes: &[u8]) -> Result<(), BrokerError> {
        let publish = self
            .broker
            .publish(topic.as_str(), &self.partition_key, bytes);
        match tokio::time::timeout(self.flush_timeout, publish).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::Timeout(self.flush_timeout.as_millis() as u64)),
        }
    }

    fn drop_event(&self, topic: Topic, envelope: &EventEnvelope, err: BrokerError) -> DeliveryReport {
        let err = AppError::from(err);
        let class = err.class();
        warn!(
            topic = %topic,
            class = class,
            event_name = envelope.event_name(),
            error = %err,
            "Event dropped"
        );
        DeliveryReport::Dropped { class }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventName, EventType};
    use crate::port::broker::mocks::{MockBehavior, MockBroker};
    use serde_json::json;

    fn create_task_event() -> EventEnvelope {
        EventEnvelope::builder(EventName::Create.with_noun("task"), "Task")
            .event_type(EventType::Model)
            .model_data(Some(json!({"title": "X"})))
            .entity_id("abc-123")
            .build()
    }

    #[tokio::test]
    async fn test_delivered_message_carries_envelope() {
        let broker = Arc::new(MockBroker::accepting());
        let publisher = EventPublisher::new(broker.clone());

        let report = publisher
            .send_event(Topic::ModelsTopic, create_task_event())
            .await;

        assert!(report.is_delivered());
        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "models_topic");
        assert_eq!(published[0].key, "MESSAGE_KEY");

        let decoded = EventEnvelope::from_slice(&published[0].value).unwrap();
        assert_eq!(decoded, create_task_event());
    }

    #[tokio::test]
    async fn test_broker_failures_are_dropped_not_raised() {
        let cases = [
            (MockBehavior::Timeout, "broker_timeout"),
            (MockBehavior::AllBrokersDown, "all_brokers_down"),
            (MockBehavior::ConnectionError, "broker_connection"),
        ];

        for (behavior, class) in cases {
            let broker = Arc::new(MockBroker::new(behavior));
            let publisher = EventPublisher::new(broker.clone());

            let report = publisher
                .send_event(Topic::EventsTopic, create_task_event())
                .await;

            assert_eq!(report, DeliveryReport::Dropped { class });
            assert!(broker.published().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_broker_is_bounded_by_flush_timeout() {
        let broker = Arc::new(MockBroker::new(MockBehavior::Hang));
        let publisher =
            EventPublisher::new(broker).with_flush_timeout(Duration::from_millis(250));

        let report = publisher
            .send_event(Topic::ModelsTopic, create_task_event())
            .await;

        assert_eq!(
            report,
            DeliveryReport::Dropped {
                class: "broker_timeout"
            }
        );
    }

    #[tokio::test]
    async fn test_custom_partition_key() {
        let broker = Arc::new(MockBroker::accepting());
        let publisher = EventPublisher::new(broker.clone()).with_partition_key("tasks");

        publisher
            .send_event(Topic::ModelsTopic, create_task_event())
            .await;

        assert_eq!(broker.published()[0].key, "tasks");
    }
}
