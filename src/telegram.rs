//! Telegram Bot API client.
//!
//! Speaks the HTTP API directly with `reqwest`: Markdown messages, chat
//! actions, photo uploads and `getUpdates` long polling. Outbound sends
//! are best effort -- failures are logged and dropped, never retried;
//! the next analyzer cycle re-evaluates and may re-alert on its own.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::analyzer::AlertSink;
use crate::config::TelegramConfig;

const API_BASE: &str = "https://api.telegram.org";

/// Pushed alerts must not stall the monitor loop. Kept independent from
/// the market sampler's 10s timeout.
const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Photo uploads carry more payload than a text push.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Long-poll window requested from the API, in seconds.
const POLL_WINDOW_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,

    /// Destination for pushed alerts; inbound replies address the
    /// originating chat instead.
    chat_id: Option<String>,
}

/// Inbound update as returned by `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Self {
        Self::with_base_url(API_BASE, config)
    }

    /// Point the client at a different API host (used by tests).
    pub fn with_base_url(base_url: impl ToString, config: TelegramConfig) -> Self {
        Self {
            client: Client::builder()
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.to_string(),
            token: config.token,
            chat_id: config.chat_id,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Send a Markdown-formatted message. Best effort: failures are
    /// logged and the message is dropped.
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, chat_id: &str, text: &str) {
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .timeout(PUSH_TIMEOUT)
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(response) => {
                if response.status().is_success() {
                    info!("successfully sent Telegram message");
                } else {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!("Telegram API error {status}: {body}");
                }
            }
            Err(e) => {
                error!("failed to send Telegram message: {e}");
            }
        }
    }

    /// Signal activity ("typing", "upload_photo") while a query is being
    /// served. Purely cosmetic, so failures only rate a debug line.
    pub async fn send_chat_action(&self, chat_id: i64, action: &str) {
        let payload = json!({
            "chat_id": chat_id,
            "action": action,
        });

        let result = self
            .client
            .post(self.endpoint("sendChatAction"))
            .timeout(PUSH_TIMEOUT)
            .json(&payload)
            .send()
            .await;

        if let Err(e) = result {
            debug!("chat action failed: {e}");
        }
    }

    /// Upload a PNG with a Markdown caption. Best effort like
    /// [`send_message`].
    #[instrument(skip(self, png, caption))]
    pub async fn send_photo(&self, chat_id: i64, png: Vec<u8>, caption: &str) {
        let part = match reqwest::multipart::Part::bytes(png)
            .file_name("chart.png")
            .mime_str("image/png")
        {
            Ok(part) => part,
            Err(e) => {
                error!("failed to build photo upload: {e}");
                return;
            }
        };

        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "Markdown")
            .part("photo", part);

        let response = self
            .client
            .post(self.endpoint("sendPhoto"))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await;

        match response {
            Ok(response) => {
                if response.status().is_success() {
                    info!("successfully sent Telegram photo");
                } else {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!("Telegram photo upload failed with {status}: {body}");
                }
            }
            Err(e) => {
                error!("failed to send Telegram photo: {e}");
            }
        }
    }

    /// Long-poll for inbound updates past `offset`.
    pub async fn get_updates(&self, offset: i64) -> anyhow::Result<Vec<Update>> {
        let response = self
            .client
            .get(self.endpoint("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", POLL_WINDOW_SECS.to_string()),
            ])
            .timeout(Duration::from_secs(POLL_WINDOW_SECS + 5))
            .send()
            .await
            .context("failed to poll for updates")?;

        if !response.status().is_success() {
            anyhow::bail!("update poll returned HTTP {}", response.status());
        }

        let payload: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .context("failed to parse update payload")?;

        if !payload.ok {
            anyhow::bail!(
                "Telegram API rejected the poll: {}",
                payload.description.unwrap_or_default()
            );
        }

        Ok(payload.result.unwrap_or_default())
    }
}

#[async_trait]
impl AlertSink for TelegramClient {
    async fn push_alert(&self, text: &str) {
        let Some(chat_id) = &self.chat_id else {
            warn!("destination chat not configured, alert suppressed");
            return;
        };

        self.send_message(chat_id, text).await;
    }
}
