// Todocore Infrastructure - Outbound Notification Adapters
// Implements: MailTransport (SMTP), ChatBot (Telegram), TaskDirectory (HTTP)

mod smtp;
mod task_api;
mod telegram;

pub use smtp::{SmtpMailTransport, SmtpSettings};
pub use task_api::HttpTaskDirectory;
pub use telegram::{TelegramBot, DEFAULT_TELEGRAM_API};
