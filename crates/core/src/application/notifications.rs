// Notification sinks: deadline e-mails and chat alerts
//
// Both sinks swallow delivery errors; callers get a bool for observability.

use crate::domain::TaskRecord;
use crate::error::AppError;
use crate::port::{ChatBot, EmailMessage, MailTransport, NotifyError};
use std::sync::Arc;
use tracing::{info, warn};

/// Subject line of every deadline reminder
pub const DEADLINE_SUBJECT: &str = "Task deadline";

/// Render the fixed deadline reminder for `task`
pub fn render_deadline_email(task: &TaskRecord, from: &str, to: &str) -> EmailMessage {
    let description = if task.description.trim().is_empty() {
        "(no description)"
    } else {
        task.description.as_str()
    };

    let body = format!(
        "The deadline of task \"{}\" is due in one hour.\n\n\
         Description: {}\n\
         Deadline: {}\n",
        task.title,
        description,
        task.deadline.format("%Y-%m-%d %H:%M UTC"),
    );

    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject: DEADLINE_SUBJECT.to_string(),
        body,
    }
}

fn log_dropped(channel: &'static str, err: NotifyError) {
    let err = AppError::from(err);
    warn!(
        channel = channel,
        class = err.class(),
        error = %err,
        "Notification not delivered"
    );
}

/// E-mail sink for deadline reminders
pub struct EmailNotifier {
    transport: Arc<dyn MailTransport>,
    from: String,
}

impl EmailNotifier {
    pub fn new(transport: Arc<dyn MailTransport>, from: impl Into<String>) -> Self {
        Self {
            transport,
            from: from.into(),
        }
    }

    /// Send the reminder for `task` to `recipient`; true when the transport accepted it
    pub async fn notify_deadline(&self, task: &TaskRecord, recipient: &str) -> bool {
        let message = render_deadline_email(task, &self.from, recipient);
        match self.transport.send(&message).await {
            Ok(()) => {
                info!(task_id = %task.id, recipient = recipient, "Deadline reminder sent");
                true
            }
            Err(e) => {
                log_dropped("email", e);
                false
            }
        }
    }
}

/// Chat sink for operational alerts
pub struct ChatAlerter {
    bot: Arc<dyn ChatBot>,
}

impl ChatAlerter {
    pub fn new(bot: Arc<dyn ChatBot>) -> Self {
        Self { bot }
    }

    /// Post `text`; true when the bot accepted it
    pub async fn alert(&self, text: &str) -> bool {
        match self.bot.send_text(text).await {
            Ok(()) => true,
            Err(e) => {
                log_dropped("chat", e);
                false
            }
        }
    }
}
