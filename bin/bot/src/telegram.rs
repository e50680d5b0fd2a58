//! Telegram Bot API transport.
//!
//! Long-polls `getUpdates` and answers with `sendMessage`. Only text
//! messages are delivered; everything else is acknowledged and dropped.

use crate::config::TelegramConfig;
use async_trait::async_trait;
use chronobot_conversation::{Inbound, Transport, TransportError};
use chronobot_core::ConversationId;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Slack added to the HTTP timeout on top of the long-poll timeout.
const POLL_SLACK: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// A parsed `getUpdates` batch.
#[derive(Debug, Default, PartialEq, Eq)]
struct Batch {
    messages: Vec<Inbound>,
    next_offset: Option<i64>,
}

fn parse_updates(body: &str) -> Result<Batch, TransportError> {
    let response: ApiResponse<Vec<Update>> =
        serde_json::from_str(body).map_err(|e| TransportError::ReceiveFailed {
            reason: format!("malformed getUpdates response: {e}"),
        })?;

    if !response.ok {
        return Err(TransportError::ReceiveFailed {
            reason: response
                .description
                .unwrap_or_else(|| "getUpdates returned ok=false".to_string()),
        });
    }

    let updates = response.result.unwrap_or_default();
    let next_offset = updates.iter().map(|u| u.update_id + 1).max();
    let messages = updates
        .into_iter()
        .filter_map(|update| {
            let message = update.message?;
            let text = message.text?;
            Some(Inbound::new(message.chat.id, text))
        })
        .collect();

    Ok(Batch {
        messages,
        next_offset,
    })
}

/// Transport over the Telegram Bot API.
pub struct TelegramTransport {
    http: reqwest::Client,
    /// `{api_url}/bot{token}`; never logged.
    base: String,
    poll_timeout: Duration,
    offset: AtomicI64,
}

impl std::fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramTransport")
            .field("poll_timeout", &self.poll_timeout)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl TelegramTransport {
    /// Creates a transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig) -> Result<Self, Report<TransportError>> {
        let poll_timeout = Duration::from_secs(config.poll_timeout_seconds);
        let http = reqwest::Client::builder()
            .timeout(poll_timeout + POLL_SLACK)
            .build()
            .map_err(|e| TransportError::ReceiveFailed {
                reason: format!("HTTP client error: {e}"),
            })?;

        Ok(Self {
            http,
            base: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.token
            ),
            poll_timeout,
            offset: AtomicI64::new(0),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base)
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    #[instrument(skip(self))]
    async fn receive(&self) -> Result<Vec<Inbound>, Report<TransportError>> {
        let request = GetUpdates {
            offset: self.offset.load(Ordering::SeqCst),
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: &["message"],
        };

        let response = self
            .http
            .post(self.method_url("getUpdates"))
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::ReceiveFailed {
                reason: if e.is_timeout() {
                    "getUpdates timed out".to_string()
                } else {
                    format!("getUpdates request failed: {}", e.without_url())
                },
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::ReceiveFailed {
                reason: format!("failed to read getUpdates body: {}", e.without_url()),
            })?;
        if !status.is_success() {
            warn!(status = %status, "getUpdates returned an error status");
        }

        let batch = parse_updates(&body)?;
        if let Some(next) = batch.next_offset {
            self.offset.fetch_max(next, Ordering::SeqCst);
        }
        debug!(count = batch.messages.len(), "received messages");
        Ok(batch.messages)
    }

    #[instrument(skip_all, fields(%conversation))]
    async fn send(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), Report<TransportError>> {
        let send_failed = |reason: String| TransportError::SendFailed {
            conversation: conversation.clone(),
            reason,
        };

        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&SendMessage {
                chat_id: conversation.as_str(),
                text,
            })
            .send()
            .await
            .map_err(|e| send_failed(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "sendMessage failed");
            return Err(send_failed(format!("status {status}")).into());
        }
        Ok(())
    }
}
