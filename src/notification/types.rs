use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form, channel-specific extension fields
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Delivery channel family. Dispatch routes strictly on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    /// Electronic mail (SMTP)
    #[serde(rename = "email")]
    Email,
    /// Team chat (Slack)
    #[serde(rename = "slack", alias = "chat")]
    Chat,
    /// Stored for retrieval inside the application
    #[serde(rename = "in_app")]
    InApp,
}

impl NotificationType {
    pub const ALL: [NotificationType; 3] = [
        NotificationType::Email,
        NotificationType::Chat,
        NotificationType::InApp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Email => "email",
            NotificationType::Chat => "slack",
            NotificationType::InApp => "in_app",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a wire name matches no known channel family
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported notification type: {0}")]
pub struct UnsupportedType(pub String);

impl FromStr for NotificationType {
    type Err = UnsupportedType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(NotificationType::Email),
            "slack" | "chat" => Ok(NotificationType::Chat),
            "in_app" => Ok(NotificationType::InApp),
            other => Err(UnsupportedType(other.to_string())),
        }
    }
}

/// Lifecycle state.
///
/// `Pending` and `Scheduled` are the two entry states; each resolves exactly
/// once into one of the terminal states `Sent` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Scheduled,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Scheduled => "scheduled",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, NotificationStatus::Sent | NotificationStatus::Failed)
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "scheduled" => Ok(NotificationStatus::Scheduled),
            "sent" => Ok(NotificationStatus::Sent),
            "failed" => Ok(NotificationStatus::Failed),
            other => Err(format!("unknown notification status: {}", other)),
        }
    }
}

/// A stored notification record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Store-assigned identifier, never reused
    pub id: i64,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    pub title: String,
    pub message: String,
    pub recipient: String,
    /// Destination override (e.g. a chat channel); empty means the sender default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Template the content was rendered from (lookup only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<i64>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Channel override, if one was given and is non-blank
    pub fn channel_override(&self) -> Option<&str> {
        self.channel
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// String metadata value under `key`, if present and a string
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Request to create a notification, immediately or on a schedule.
///
/// The type is carried as its wire name so that an unknown type surfaces as
/// an `UnsupportedType` error rather than a generic body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationRequest {
    #[serde(rename = "type", default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub template_id: Option<i64>,
    /// Variable bindings for the template
    #[serde(default)]
    pub template_data: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl NotificationRequest {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            notification_type: Some(notification_type.as_str().to_string()),
            title: title.into(),
            message: message.into(),
            recipient: recipient.into(),
            ..Default::default()
        }
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn template(mut self, template_id: i64, data: serde_json::Value) -> Self {
        self.template_id = Some(template_id);
        self.template_data = Some(data);
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Request to create a deferred notification
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    #[serde(flatten)]
    pub notification: NotificationRequest,
    pub scheduled_at: DateTime<Utc>,
}

/// Partial update of a notification.
///
/// Only content fields are patchable; lifecycle fields (status, sent_at,
/// scheduled_at) are rejected during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationPatch {
    pub title: Option<String>,
    pub message: Option<String>,
    pub recipient: Option<String>,
    /// Empty string clears the override
    pub channel: Option<String>,
    pub metadata: Option<Metadata>,
}

impl NotificationPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.message.is_none()
            && self.recipient.is_none()
            && self.channel.is_none()
            && self.metadata.is_none()
    }

    /// Write the patched fields into `notification` and bump `updated_at`
    pub fn apply(self, notification: &mut Notification, at: DateTime<Utc>) {
        if let Some(title) = self.title {
            notification.title = title;
        }
        if let Some(message) = self.message {
            notification.message = message;
        }
        if let Some(recipient) = self.recipient {
            notification.recipient = recipient;
        }
        if let Some(channel) = self.channel {
            notification.channel = if channel.trim().is_empty() {
                None
            } else {
                Some(channel)
            };
        }
        if let Some(metadata) = self.metadata {
            notification.metadata = metadata;
        }
        notification.updated_at = at;
    }
}

/// Filters for listing notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationFilter {
    pub status: Option<NotificationStatus>,
    pub notification_type: Option<NotificationType>,
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        self.status.map_or(true, |s| notification.status == s)
            && self
                .notification_type
                .map_or(true, |t| notification.notification_type == t)
    }
}

/// One page of notifications plus the size of the whole filtered set
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
