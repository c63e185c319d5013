// Message Broker Port

use async_trait::async_trait;
use thiserror::Error;

/// Broker client errors
#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    #[error("broker timed out after {0}ms")]
    Timeout(u64),

    #[error("no brokers available: {0}")]
    AllBrokersDown(String),

    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("event serialization failed: {0}")]
    Serialization(String),

    #[error("broker error: {0}")]
    Other(String),
}

impl BrokerError {
    pub fn class(&self) -> &'static str {
        match self {
            BrokerError::Timeout(_) => "broker_timeout",
            BrokerError::AllBrokersDown(_) => "all_brokers_down",
            BrokerError::Connection(_) => "broker_connection",
            BrokerError::Serialization(_) => "serialization",
            BrokerError::Other(_) => "broker_error",
        }
    }
}

/// Topic-routed publish client.
///
/// One instance is shared by every publisher in the process; implementations
/// must be safe for concurrent use.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Publish `value` under `key` to `topic`, returning once the broker has
    /// accepted (buffered or flushed) the message
    async fn publish(&self, topic: &str, key: &str, value: &[u8]) -> Result<(), BrokerError>;

    /// Lightweight reachability check
    async fn ping(&self) -> Result<(), BrokerError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock broker behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Accept every message
        Accept,
        /// Fail with BrokerError::Timeout
        Timeout,
        /// Fail with BrokerError::AllBrokersDown
        AllBrokersDown,
        /// Fail with BrokerError::Connection
        ConnectionError,
        /// Never answer (exercises caller-side timeouts)
        Hang,
    }

    /// Message captured by the mock
    #[derive(Debug, Clone, PartialEq)]
    pub struct PublishedMessage {
        pub topic: String,
        pub key: String,
        pub value: Vec<u8>,
    }

    /// Mock broker recording every accepted message
    pub struct MockBroker {
        behavior: Mutex<MockBehavior>,
        published: Mutex<Vec<PublishedMessage>>,
    }

    impl MockBroker {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Mutex::new(behavior),
                published: Mutex::new(Vec::new()),
            }
        }

        pub fn accepting() -> Self {
            Self::new(MockBehavior::Accept)
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        pub fn published(&self) -> Vec<PublishedMessage> {
            self.published.lock().unwrap().clone()
        }

        fn outcome(&self) -> Result<(), BrokerError> {
            match self.behavior.lock().unwrap().clone() {
                MockBehavior::Accept | MockBehavior::Hang => Ok(()),
                MockBehavior::Timeout => Err(BrokerError::Timeout(5000)),
                MockBehavior::AllBrokersDown => {
                    Err(BrokerError::AllBrokersDown("0/1 brokers are up".to_string()))
                }
                MockBehavior::ConnectionError => {
                    Err(BrokerError::Connection("connection refused".to_string()))
                }
            }
        }

        async fn maybe_hang(&self) {
            let hang = matches!(*self.behavior.lock().unwrap(), MockBehavior::Hang);
            if hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    }

    #[async_trait]
    impl BrokerClient for MockBroker {
        async fn publish(&self, topic: &str, key: &str, value: &[u8]) -> Result<(), BrokerError> {
            self.maybe_hang().await;
            self.outcome()?;
            self.published.lock().unwrap().push(PublishedMessage {
                topic: topic.to_string(),
                key: key.to_string(),
                value: value.to_vec(),
            });
            Ok(())
        }

        async fn ping(&self) -> Result<(), BrokerError> {
            self.maybe_hang().await;
            self.outcome()
        }
    }
}
