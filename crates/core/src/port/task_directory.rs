// Task Directory Port
//
// Re-fetches a task at job execution time; the task itself is owned by the
// CRUD service, never by this crate.

use crate::domain::{EntityId, TaskRecord};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TaskDirectory: Send + Sync {
    /// Current snapshot of a task, with its assignee resolved when possible.
    ///
    /// Ok(None) when the task no longer exists.
    async fn find_task(&self, id: EntityId) -> Result<Option<TaskRecord>>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryTaskDirectory {
        tasks: Mutex<HashMap<EntityId, TaskRecord>>,
    }

    impl InMemoryTaskDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, task: TaskRecord) {
            self.tasks.lock().unwrap().insert(task.id, task);
        }

        pub fn remove(&self, id: EntityId) {
            self.tasks.lock().unwrap().remove(&id);
        }
    }

    #[async_trait]
    impl TaskDirectory for InMemoryTaskDirectory {
        async fn find_task(&self, id: EntityId) -> Result<Option<TaskRecord>> {
            Ok(self.tasks.lock().unwrap().get(&id).cloned())
        }
    }
}
