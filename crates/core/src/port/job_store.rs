// Job Store Port (key-value index of the live job per entity)

use crate::domain::{JobHandle, JobKey};
use async_trait::async_trait;
use thiserror::Error;

/// Job store errors
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("job store unreachable: {0}")]
    Unreachable(String),

    #[error("job store timed out after {0}ms")]
    Timeout(u64),

    #[error("job store protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    pub fn class(&self) -> &'static str {
        match self {
            StoreError::Unreachable(_) => "store_unreachable",
            StoreError::Timeout(_) => "store_timeout",
            StoreError::Protocol(_) => "store_protocol",
        }
    }
}

/// Key-value index mapping `(job_kind, entity_id)` to a work-queue handle.
///
/// No business logic and no TTL: a key lives until deleted or overwritten.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Read the handle stored under `key`
    async fn get(&self, key: &JobKey) -> Result<Option<JobHandle>, StoreError>;

    /// Store `handle` under `key`, replacing any previous value
    async fn set(&self, key: &JobKey, handle: &JobHandle) -> Result<(), StoreError>;

    /// Delete `key`; returns whether it existed
    async fn delete(&self, key: &JobKey) -> Result<bool, StoreError>;

    /// Lightweight connectivity check
    async fn ping(&self) -> Result<(), StoreError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory job store with an "unreachable" switch
    #[derive(Default)]
    pub struct InMemoryJobStore {
        entries: Mutex<HashMap<String, JobHandle>>,
        unreachable: AtomicBool,
        writes: AtomicUsize,
        deletes: AtomicUsize,
    }

    impl InMemoryJobStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_unreachable(&self, unreachable: bool) {
            self.unreachable.store(unreachable, Ordering::SeqCst);
        }

        /// Raw lookup by storage key, bypassing the unreachable switch
        pub fn get_raw(&self, storage_key: &str) -> Option<JobHandle> {
            self.entries.lock().unwrap().get(storage_key).cloned()
        }

        pub fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn delete_count(&self) -> usize {
            self.deletes.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.unreachable.load(Ordering::SeqCst) {
                return Err(StoreError::Unreachable("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl JobStore for InMemoryJobStore {
        async fn get(&self, key: &JobKey) -> Result<Option<JobHandle>, StoreError> {
            self.check()?;
            Ok(self.get_raw(&key.storage_key()))
        }

        async fn set(&self, key: &JobKey, handle: &JobHandle) -> Result<(), StoreError> {
            self.check()?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.entries
                .lock()
                .unwrap()
                .insert(key.storage_key(), handle.clone());
            Ok(())
        }

        async fn delete(&self, key: &JobKey) -> Result<bool, StoreError> {
            self.check()?;
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .entries
                .lock()
                .unwrap()
                .remove(&key.storage_key())
                .is_some())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.check()
        }
    }
}
