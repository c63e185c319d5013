// Redis JobStore Implementation

use crate::connection::{LazyConnection, RoundTripError};
use async_trait::async_trait;
use redis::RedisError;
use std::sync::Arc;
use todocore_core::domain::{JobHandle, JobKey};
use todocore_core::port::{JobStore, StoreError};

fn map_store_error(err: RoundTripError) -> StoreError {
    match err {
        RoundTripError::Timeout(ms) => StoreError::Timeout(ms),
        RoundTripError::Redis(e) => map_redis_error(e),
    }
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        StoreError::Unreachable(err.to_string())
    } else if err.is_timeout() {
        StoreError::Timeout(0)
    } else {
        StoreError::Protocol(err.to_string())
    }
}

/// Job index stored as plain string keys (`task: {kind}: {entity_id}` -> handle)
pub struct RedisJobStore {
    conn: Arc<LazyConnection>,
}

impl RedisJobStore {
    pub fn new(conn: Arc<LazyConnection>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn get(&self, key: &JobKey) -> Result<Option<JobHandle>, StoreError> {
        let key = key.storage_key();
        let value: Option<String> = self
            .conn
            .run(|mut con| async move { redis::cmd("GET").arg(&key).query_async(&mut con).await })
            .await
            .map_err(map_store_error)?;
        Ok(value.map(JobHandle::from))
    }

    async fn set(&self, key: &JobKey, handle: &JobHandle) -> Result<(), StoreError> {
        let key = key.storage_key();
        let handle = handle.as_str().to_string();
        let _: () = self
            .conn
            .run(|mut con| async move {
                redis::cmd("SET")
                    .arg(&key)
                    .arg(&handle)
                    .query_async(&mut con)
                    .await
            })
            .await
            .map_err(map_store_error)?;
        Ok(())
    }

    async fn delete(&self, key: &JobKey) -> Result<bool, StoreError> {
        let key = key.storage_key();
        let removed: i64 = self
            .conn
            .run(|mut con| async move { redis::cmd("DEL").arg(&key).query_async(&mut con).await })
            .await
            .map_err(map_store_error)?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let _: String = self
            .conn
            .run(|mut con| async move { redis::cmd("PING").query_async(&mut con).await })
            .await
            .map_err(map_store_error)?;
        Ok(())
    }
}
