//! Team-chat channel over the Slack Web API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::ChatConfig;
use crate::notification::Notification;

use super::{ChannelError, ChannelSender};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelope returned by every Web API method
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct ChatSender {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatSender {
    pub fn new(config: ChatConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChannelError::Configuration(format!("HTTP client error: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), method)
    }

    async fn call(&self, method: &str, payload: Option<&Value>) -> Result<(), ChannelError> {
        let mut request = self
            .client
            .post(self.endpoint(method))
            .bearer_auth(&self.config.token);
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Transport(format!("{} request failed: {}", method, e)))?
            .error_for_status()
            .map_err(|e| ChannelError::Transport(format!("{} returned {}", method, e)))?;

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(format!("{} response unreadable: {}", method, e)))?;

        if body.ok {
            Ok(())
        } else {
            Err(ChannelError::Rejected(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ))
        }
    }
}

/// Build the `chat.postMessage` payload.
///
/// `blocks` and `attachments` are copied from metadata only when they are
/// arrays.
pub fn build_payload(default_channel: &str, notification: &Notification) -> Value {
    let channel = notification.channel_override().unwrap_or(default_channel);

    let mut payload = json!({
        "channel": channel,
        "text": notification.message,
    });

    for key in ["blocks", "attachments"] {
        if let Some(value @ Value::Array(_)) = notification.metadata.get(key) {
            payload[key] = value.clone();
        }
    }

    payload
}

#[async_trait]
impl ChannelSender for ChatSender {
    async fn send(&self, notification: &Notification) -> Result<(), ChannelError> {
        let payload = build_payload(&self.config.default_channel, notification);
        self.call("chat.postMessage", Some(&payload)).await?;

        tracing::debug!(
            notification_id = notification.id,
            channel = %payload["channel"],
            "Chat message posted"
        );

        Ok(())
    }

    async fn test_connection(&self) -> Result<(), ChannelError> {
        self.call("auth.test", None).await
    }
}
