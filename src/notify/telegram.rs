//! Telegram Bot API notifier.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::{truncate_message, Notifier};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Sends plain-text messages to one chat via `sendMessage`.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str) -> Result<Self, reqwest::Error> {
        Self::with_api_base(token, chat_id, DEFAULT_API_BASE)
    }

    /// Notifier against a custom API host (local stub server in tests).
    pub fn with_api_base(
        token: &str,
        chat_id: &str,
        api_base: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: truncate_message(text),
        };

        match self.http.post(self.endpoint()).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Telegram notification delivered");
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(%status, body = %body, "Telegram API rejected notification");
            }
            Err(e) if e.is_timeout() => {
                warn!("Telegram notification timed out");
            }
            Err(e) => {
                // without_url keeps the bot token out of the log
                warn!(error = %e.without_url(), "Telegram notification failed");
            }
        }
    }
}
