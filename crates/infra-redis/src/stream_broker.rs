// Redis Streams BrokerClient Implementation
//
// Each topic is a stream; one message is `XADD {topic} * key {key} value {json}`.

use crate::connection::{LazyConnection, RoundTripError};
use async_trait::async_trait;
use redis::RedisError;
use std::sync::Arc;
use todocore_core::port::{BrokerClient, BrokerError};
use tracing::debug;

fn map_broker_error(err: RoundTripError) -> BrokerError {
    match err {
        RoundTripError::Timeout(ms) => BrokerError::Timeout(ms),
        RoundTripError::Redis(e) => map_redis_error(e),
    }
}

fn map_redis_error(err: RedisError) -> BrokerError {
    if err.is_connection_refusal() {
        // single-node deployment: a refused connection means no broker at all
        BrokerError::AllBrokersDown(err.to_string())
    } else if err.is_connection_dropped() || err.is_io_error() {
        BrokerError::Connection(err.to_string())
    } else if err.is_timeout() {
        BrokerError::Timeout(0)
    } else {
        BrokerError::Other(err.to_string())
    }
}

/// Topic-routed publisher over Redis Streams
pub struct RedisStreamBroker {
    conn: Arc<LazyConnection>,
    max_len: Option<usize>,
}

impl RedisStreamBroker {
    pub fn new(conn: Arc<LazyConnection>) -> Self {
        Self {
            conn,
            max_len: None,
        }
    }

    /// Trim each stream to roughly `max_len` entries on append
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    fn xadd(&self, topic: &str, key: &str, value: &[u8]) -> redis::Cmd {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(topic);
        if let Some(max_len) = self.max_len {
            cmd.arg("MAXLEN").arg("~").arg(max_len);
        }
        cmd.arg("*").arg("key").arg(key).arg("value").arg(value);
        cmd
    }
}

#[async_trait]
impl BrokerClient for RedisStreamBroker {
    async fn publish(&self, topic: &str, key: &str, value: &[u8]) -> Result<(), BrokerError> {
        let cmd = self.xadd(topic, key, value);
        let id: String = self
            .conn
            .run(|mut con| async move { cmd.query_async(&mut con).await })
            .await
            .map_err(map_broker_error)?;
        debug!(topic = topic, id = %id, "Stream entry appended");
        Ok(())
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        let _: String = self
            .conn
            .run(|mut con| async move { redis::cmd("PING").query_async(&mut con).await })
            .await
            .map_err(map_broker_error)?;
        Ok(())
    }
}
