// Lazily established, auto-reconnecting Redis connection

use redis::aio::ConnectionManager;
use redis::{Client, RedisError, RedisResult};
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

/// Default bound on one round trip, connection setup included
pub const DEFAULT_ROUND_TRIP_TIMEOUT: Duration = Duration::from_secs(3);

/// Failure of one bounded round trip
#[derive(Debug)]
pub enum RoundTripError {
    /// No answer within the timeout (milliseconds)
    Timeout(u64),
    Redis(RedisError),
}

/// Process-lifetime Redis handle.
///
/// Nothing touches the network until the first command. The connection is
/// multiplexed, so clones share one socket and need no locking.
pub struct LazyConnection {
    client: Client,
    manager: OnceCell<ConnectionManager>,
    timeout: Duration,
}

impl LazyConnection {
    /// Parse `url`; fails only on a malformed URL
    pub fn open(url: &str, timeout: Duration) -> RedisResult<Self> {
        Ok(Self {
            client: Client::open(url)?,
            manager: OnceCell::new(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn connection(&self) -> RedisResult<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone()).await?;
                info!(addr = %self.client.get_connection_info().addr, "Redis connection established");
                Ok::<_, RedisError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }

    /// Run `op` on the shared connection, bounded by the round-trip timeout
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, RoundTripError>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let round_trip = async {
            let con = self.connection().await?;
            op(con).await
        };
        match tokio::time::timeout(self.timeout, round_trip).await {
            Ok(result) => result.map_err(RoundTripError::Redis),
            Err(_) => Err(RoundTripError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_is_lazy() {
        // nothing listens here; open must still succeed
        assert!(LazyConnection::open("redis://127.0.0.1:1/0", DEFAULT_ROUND_TRIP_TIMEOUT).is_ok());
    }

    #[test]
    fn test_open_rejects_malformed_url() {
        assert!(LazyConnection::open("not a url", DEFAULT_ROUND_TRIP_TIMEOUT).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_within_timeout() {
        let conn = LazyConnection::open("redis://127.0.0.1:1/0", Duration::from_millis(300)).unwrap();

        let started = std::time::Instant::now();
        let result: Result<String, _> = conn
            .run(|mut con| async move { redis::cmd("PING").query_async(&mut con).await })
            .await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
