//! Telegram notifications
//!
//! Fire-and-forget delivery: a failed send is logged and swallowed. An
//! unreachable Telegram must never stall or abort a trading cycle.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::TelegramConfig;

pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        TelegramNotifier {
            client,
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    /// Deliver one message; failures are logged, never propagated.
    pub async fn send_message(&self, text: &str) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("telegram message delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "telegram rejected message");
            }
            Err(e) => {
                warn!(error = %e, "telegram delivery failed");
            }
        }
    }
}

/// Optional notifier so call sites stay unconditional
pub struct Notifier(Option<TelegramNotifier>);

impl Notifier {
    pub fn from_config(config: Option<&TelegramConfig>) -> Self {
        Notifier(config.map(TelegramNotifier::new))
    }

    pub fn disabled() -> Self {
        Notifier(None)
    }

    pub async fn send(&self, text: &str) {
        if let Some(inner) = &self.0 {
            inner.send_message(text).await;
        }
    }
}
