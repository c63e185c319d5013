// Deferred job bodies
//
// The work queue stores a task name plus string arguments; at execution time
// the worker resolves the name through a HandlerRegistry.

use crate::application::notifications::EmailNotifier;
use crate::domain::{TaskRef, SEND_DEADLINE_NOTIFICATION};
use crate::error::Result;
use crate::port::TaskDirectory;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Body of one kind of deferred job
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Task name this handler is registered under
    fn task_name(&self) -> &'static str;

    /// Execute with the arguments captured at submission time
    async fn handle(&self, task: &TaskRef) -> Result<()>;
}

/// Task name -> handler lookup used by the worker
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own task name, replacing any previous one
    pub fn register(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(handler.task_name(), handler);
        self
    }

    pub fn get(&self, task_name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(task_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Sends the "deadline in one hour" e-mail for a task.
///
/// The task is re-fetched at execution time; a task deleted in the meantime
/// or one without a resolvable assignee e-mail completes without sending.
pub struct DeadlineReminderHandler {
    directory: Arc<dyn TaskDirectory>,
    notifier: Arc<EmailNotifier>,
}

impl DeadlineReminderHandler {
    pub fn new(directory: Arc<dyn TaskDirectory>, notifier: Arc<EmailNotifier>) -> Self {
        Self {
            directory,
            notifier,
        }
    }
}

#[async_trait]
impl JobHandler for DeadlineReminderHandler {
    fn task_name(&self) -> &'static str {
        SEND_DEADLINE_NOTIFICATION
    }

    async fn handle(&self, task: &TaskRef) -> Result<()> {
        let task_id = task.entity_arg()?;

        let Some(record) = self.directory.find_task(task_id).await? else {
            warn!(task_id = %task_id, "Task no longer exists; reminder skipped");
            return Ok(());
        };

        let Some(recipient) = record.assignee_email() else {
            warn!(
                task_id = %task_id,
                assignee = %record.assignee.id(),
                "Assignee has no e-mail; reminder skipped"
            );
            return Ok(());
        };

        let delivered = self.notifier.notify_deadline(&record, recipient).await;
        info!(task_id = %task_id, delivered = delivered, "Deadline reminder handled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityRef, TaskRecord, UserRecord};
    use crate::port::notifier::mocks::RecordingMailTransport;
    use crate::port::task_directory::mocks::InMemoryTaskDirectory;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(id: Uuid, email: Option<&str>) -> TaskRecord {
        TaskRecord {
            id,
            title: "Ship release".to_string(),
            description: String::new(),
            deadline: Utc::now(),
            status: "todo".to_string(),
            assignee: EntityRef::Resolved(UserRecord {
                id: Uuid::new_v4(),
                email: email.map(str::to_string),
            }),
            project: EntityRef::Id(Uuid::new_v4()),
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn handler(
        directory: Arc<InMemoryTaskDirectory>,
        transport: Arc<RecordingMailTransport>,
    ) -> DeadlineReminderHandler {
        DeadlineReminderHandler::new(
            directory,
            Arc::new(EmailNotifier::new(transport, "noreply@example.com")),
        )
    }

    #[tokio::test]
    async fn test_reminder_sends_to_assignee() {
        let id = Uuid::new_v4();
        let directory = Arc::new(InMemoryTaskDirectory::new());
        directory.insert(record(id, Some("owner@example.com")));
        let transport = Arc::new(RecordingMailTransport::new());

        handler(directory, transport.clone())
            .handle(&TaskRef::deadline_notification(id))
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "owner@example.com");
    }

    #[tokio::test]
    async fn test_deleted_task_completes_without_mail() {
        let transport = Arc::new(RecordingMailTransport::new());
        let result = handler(Arc::new(InMemoryTaskDirectory::new()), transport.clone())
            .handle(&TaskRef::deadline_notification(Uuid::new_v4()))
            .await;

        assert!(result.is_ok());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_assignee_completes_without_mail() {
        let id = Uuid::new_v4();
        let directory = Arc::new(InMemoryTaskDirectory::new());
        directory.insert(record(id, None));
        let transport = Arc::new(RecordingMailTransport::new());

        handler(directory, transport.clone())
            .handle(&TaskRef::deadline_notification(id))
            .await
            .unwrap();
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_bad_arguments_fail() {
        let transport = Arc::new(RecordingMailTransport::new());
        let result = handler(Arc::new(InMemoryTaskDirectory::new()), transport)
            .handle(&TaskRef::new(SEND_DEADLINE_NOTIFICATION, vec!["nope".into()]))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_registry_lookup() {
        let handler = handler(
            Arc::new(InMemoryTaskDirectory::new()),
            Arc::new(RecordingMailTransport::new()),
        );
        let registry = HandlerRegistry::new().register(Arc::new(handler));

        assert_eq!(registry.len(), 1);
        assert!(registry.get(SEND_DEADLINE_NOTIFICATION).is_some());
        assert!(registry.get("task.unknown").is_none());
    }
}
