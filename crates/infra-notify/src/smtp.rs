// SMTP MailTransport Implementation (lettre, async)

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use todocore_core::port::{EmailMessage, MailTransport, NotifyError};
use tracing::debug;

/// SMTP relay settings
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upgrade with STARTTLS; plain connection otherwise (local relays, tests)
    pub starttls: bool,
}

/// Mail transport over one pooled async SMTP client
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let mut builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| NotifyError::Transport(format!("SMTP relay: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };
        builder = builder.port(settings.port);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
        })
    }
}

fn to_lettre(message: &EmailMessage) -> Result<Message, NotifyError> {
    let from: Mailbox = message
        .from
        .parse()
        .map_err(|e| NotifyError::InvalidMessage(format!("Invalid from: {}", e)))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e| NotifyError::InvalidMessage(format!("Invalid to: {}", e)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| NotifyError::InvalidMessage(format!("Build email: {}", e)))
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let email = to_lettre(message)?;
        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(format!("SMTP send: {}", e)))?;
        debug!(to = %message.to, "Email handed to SMTP relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            from: "Todocore <noreply@example.com>".to_string(),
            to: to.to_string(),
            subject: "Task deadline".to_string(),
            body: "due in one hour".to_string(),
        }
    }

    #[test]
    fn test_message_conversion() {
        let email = to_lettre(&message("dev@example.com")).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("To: dev@example.com"));
        assert!(raw.contains("Subject: Task deadline"));
        assert!(raw.contains("due in one hour"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let result = to_lettre(&message("not an address"));
        assert!(matches!(result, Err(NotifyError::InvalidMessage(_))));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_transport_error() {
        let transport = SmtpMailTransport::new(&SmtpSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: None,
            password: None,
            starttls: false,
        })
        .unwrap();

        let result = transport.send(&message("dev@example.com")).await;
        assert!(matches!(result, Err(NotifyError::Transport(_))));
    }
}
