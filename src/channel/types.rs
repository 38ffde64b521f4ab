use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notification::{Metadata, NotificationType};

/// Errors raised by channel transports
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    /// Recipient address/destination the transport cannot use
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Transport could not be reached or the exchange broke down
    #[error("Transport error: {0}")]
    Transport(String),

    /// Transport answered but refused the request
    #[error("Rejected by transport: {0}")]
    Rejected(String),

    /// Sender is misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// An administrative channel record.
///
/// Channels are listed and managed through the API; dispatch itself routes
/// on the notification type and never consults these records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub config: Metadata,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Request to register a channel
#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub config: Metadata,
}

impl CreateChannelRequest {
    /// Build an unsaved channel; the store assigns the id
    pub fn into_channel(self, now: DateTime<Utc>) -> Channel {
        Channel {
            id: 0,
            name: self.name,
            notification_type: self.notification_type,
            config: self.config,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}
