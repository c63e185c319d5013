// Notification Channel Ports (e-mail transport, chat bot)

use async_trait::async_trait;
use thiserror::Error;

/// Notification delivery errors
#[derive(Error, Debug, Clone)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl NotifyError {
    pub fn class(&self) -> &'static str {
        match self {
            NotifyError::Transport(_) => "notify_transport",
            NotifyError::Rejected { .. } => "notify_rejected",
            NotifyError::InvalidMessage(_) => "notify_invalid_message",
        }
    }
}

/// Rendered plain-text e-mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail transport (SMTP in production)
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Chat bot posting free text to a fixed chat
#[async_trait]
pub trait ChatBot: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Mail transport recording sent messages
    #[derive(Default)]
    pub struct RecordingMailTransport {
        sent: Mutex<Vec<EmailMessage>>,
        failing: AtomicBool,
    }

    impl RecordingMailTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            let transport = Self::default();
            transport.failing.store(true, Ordering::SeqCst);
            transport
        }

        pub fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailTransport for RecordingMailTransport {
        async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(NotifyError::Transport("smtp connection refused".to_string()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    /// Chat bot recording posted texts
    #[derive(Default)]
    pub struct RecordingChatBot {
        texts: Mutex<Vec<String>>,
        failing: AtomicBool,
    }

    impl RecordingChatBot {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn texts(&self) -> Vec<String> {
            self.texts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBot for RecordingChatBot {
        async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(NotifyError::Rejected {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            self.texts.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }
}
