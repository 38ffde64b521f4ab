//! Channel transports and the type-based dispatcher.
//!
//! Every channel family implements [`ChannelSender`]. The
//! [`ChannelDispatcher`] holds one sender per [`NotificationType`] and routes
//! on the notification's type.
//!
//! [`NotificationType`]: crate::notification::NotificationType

mod backoff;
mod chat;
mod dispatcher;
mod email;
mod in_app;
mod types;

use async_trait::async_trait;

use crate::notification::Notification;

pub use backoff::Backoff;
pub use chat::{build_payload, ChatSender};
pub use dispatcher::ChannelDispatcher;
pub use email::{build_message, EmailSender, HTML_CONTENT_KEY};
pub use in_app::{InAppSender, InboxEntry, InboxPage};
pub use types::{Channel, ChannelError, CreateChannelRequest};

/// Transport capability for one channel family
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Deliver the notification's content
    async fn send(&self, notification: &Notification) -> Result<(), ChannelError>;

    /// Check that the transport is reachable
    async fn test_connection(&self) -> Result<(), ChannelError>;
}
