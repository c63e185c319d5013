// Telegram ChatBot Implementation

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use todocore_core::port::{ChatBot, NotifyError};

/// Public Bot API endpoint
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Posts plain text to one chat through `sendMessage`
pub struct TelegramBot {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramBot {
    pub fn new(
        api_base: &str,
        token: &str,
        chat_id: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token),
            chat_id: chat_id.into(),
        })
    }
}

#[async_trait]
impl ChatBot for TelegramBot {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            // without_url: the endpoint embeds the bot token
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
