//! In-application channel.
//!
//! Delivery stores the notification in the recipient's inbox; there is no
//! outbound network step. Inboxes are bounded and drop their oldest entry
//! when full.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::InAppConfig;
use crate::notification::Notification;

use super::{ChannelError, ChannelSender};

/// A notification as seen in a recipient's inbox
#[derive(Debug, Clone, Serialize)]
pub struct InboxEntry {
    pub notification_id: i64,
    pub title: String,
    pub message: String,
    pub delivered_at: DateTime<Utc>,
    pub read: bool,
}

/// Page of inbox entries, newest first
#[derive(Debug, Serialize)]
pub struct InboxPage {
    pub entries: Vec<InboxEntry>,
    pub total: usize,
    pub unread: usize,
}

pub struct InAppSender {
    inboxes: DashMap<String, VecDeque<InboxEntry>>,
    config: InAppConfig,
    clock: Arc<dyn Clock>,
}

impl InAppSender {
    pub fn new(config: InAppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inboxes: DashMap::new(),
            config,
            clock,
        }
    }

    /// Entries for `user`, newest first
    pub fn inbox(&self, user: &str, limit: usize, offset: usize) -> InboxPage {
        match self.inboxes.get(user) {
            Some(inbox) => InboxPage {
                entries: inbox.iter().rev().skip(offset).take(limit).cloned().collect(),
                total: inbox.len(),
                unread: inbox.iter().filter(|e| !e.read).count(),
            },
            None => InboxPage {
                entries: Vec::new(),
                total: 0,
                unread: 0,
            },
        }
    }

    /// Mark one entry as read. Returns false when the user has no such entry.
    pub fn mark_read(&self, notification_id: i64, user: &str) -> bool {
        let Some(mut inbox) = self.inboxes.get_mut(user) else {
            return false;
        };

        match inbox
            .iter_mut()
            .find(|e| e.notification_id == notification_id)
        {
            Some(entry) => {
                entry.read = true;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ChannelSender for InAppSender {
    async fn send(&self, notification: &Notification) -> Result<(), ChannelError> {
        let recipient = notification.recipient.trim();
        if recipient.is_empty() {
            return Err(ChannelError::InvalidRecipient(
                "in-app recipient must not be empty".to_string(),
            ));
        }

        let entry = InboxEntry {
            notification_id: notification.id,
            title: notification.title.clone(),
            message: notification.message.clone(),
            delivered_at: self.clock.now(),
            read: false,
        };

        let mut inbox = self.inboxes.entry(recipient.to_string()).or_default();
        if inbox.len() >= self.config.max_inbox_size.max(1) {
            if let Some(dropped) = inbox.pop_front() {
                tracing::debug!(
                    recipient = %recipient,
                    dropped_id = dropped.notification_id,
                    "Dropped oldest inbox entry from full inbox"
                );
            }
        }
        inbox.push_back(entry);

        tracing::debug!(
            recipient = %recipient,
            notification_id = notification.id,
            inbox_size = inbox.len(),
            "Stored in-app notification"
        );

        Ok(())
    }

    async fn test_connection(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
