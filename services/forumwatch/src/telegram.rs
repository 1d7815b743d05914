//! Telegram Bot API notification client

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TelegramConfig;
use crate::io::HttpClient;
use crate::notifier::{Destination, Notifier};

/// Subset of the Bot API response envelope
#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Escape text for a `parse_mode=HTML` message body
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Telegram message sender
pub struct TelegramNotifier {
    api_base_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig, http: Arc<dyn HttpClient>) -> Self {
        let api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        tracing::debug!("Created TelegramNotifier against {}", api_base_url);
        Self { api_base_url, http }
    }

    fn send_message_url(&self, bot_token: &str) -> String {
        format!("{}/bot{}/sendMessage", self.api_base_url, bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn type_name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, destination: &Destination, text: &str) -> crate::Result<()> {
        if !destination.is_complete() {
            return Err(crate::ForumWatchError::Notify(
                "Telegram configuration is incomplete".to_string(),
            ));
        }

        let params = [
            ("chat_id", destination.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "HTML"),
        ];

        tracing::debug!(
            "Sending Telegram message to chat {} ({} chars)",
            destination.chat_id,
            text.len()
        );

        let response = self
            .http
            .post_form(&self.send_message_url(&destination.bot_token), &params)
            .await
            .map_err(|e| crate::ForumWatchError::Notify(e.to_string()))?;

        let parsed = serde_json::from_str::<TelegramResponse>(&response.body).ok();
        if response.status != 200 || !parsed.as_ref().is_some_and(|r| r.ok) {
            let detail = parsed
                .and_then(|r| r.description)
                .unwrap_or(response.body);
            return Err(crate::ForumWatchError::Notify(format!(
                "Telegram API returned status {}: {}",
                response.status, detail
            )));
        }

        tracing::debug!("Telegram message sent successfully");
        Ok(())
    }
}
