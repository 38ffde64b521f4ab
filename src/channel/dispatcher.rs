use std::sync::Arc;
use std::time::Instant;

use crate::config::RetryConfig;
use crate::metrics::DispatchMetrics;
use crate::notification::{Notification, NotificationType};

use super::backoff::Backoff;
use super::{ChannelError, ChannelSender};

/// Routes notifications to the sender for their type.
///
/// Each channel family has exactly one sender; adding a family means adding
/// a field and a match arm here.
pub struct ChannelDispatcher {
    email: Arc<dyn ChannelSender>,
    chat: Arc<dyn ChannelSender>,
    in_app: Arc<dyn ChannelSender>,
    retry: RetryConfig,
}

impl ChannelDispatcher {
    /// Create a dispatcher that sends each notification once
    pub fn new(
        email: Arc<dyn ChannelSender>,
        chat: Arc<dyn ChannelSender>,
        in_app: Arc<dyn ChannelSender>,
    ) -> Self {
        Self::with_retry(email, chat, in_app, RetryConfig::default())
    }

    /// Create a dispatcher with a retry policy for transport failures
    pub fn with_retry(
        email: Arc<dyn ChannelSender>,
        chat: Arc<dyn ChannelSender>,
        in_app: Arc<dyn ChannelSender>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            email,
            chat,
            in_app,
            retry,
        }
    }

    fn sender_for(&self, notification_type: NotificationType) -> &Arc<dyn ChannelSender> {
        match notification_type {
            NotificationType::Email => &self.email,
            NotificationType::Chat => &self.chat,
            NotificationType::InApp => &self.in_app,
        }
    }

    /// Deliver a notification through the sender for its type
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, notification),
        fields(
            notification_id = notification.id,
            notification_type = %notification.notification_type
        )
    )]
    pub async fn dispatch(&self, notification: &Notification) -> Result<(), ChannelError> {
        let notification_type = notification.notification_type;
        let sender = self.sender_for(notification_type);
        let mut backoff = Backoff::new(self.retry.clone());
        let start = Instant::now();

        let result = loop {
            match sender.send(notification).await {
                Ok(()) => break Ok(()),
                // These fail the same way on every attempt
                Err(e @ (ChannelError::InvalidRecipient(_) | ChannelError::Configuration(_))) => {
                    break Err(e)
                }
                Err(e) => match backoff.next_delay() {
                    Some(delay) => {
                        tracing::debug!(
                            attempt = backoff.attempt(),
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Send failed, retrying"
                        );
                        DispatchMetrics::record_retry(notification_type);
                        tokio::time::sleep(delay).await;
                    }
                    None => break Err(e),
                },
            }
        };

        DispatchMetrics::record(
            notification_type,
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );

        result
    }

    /// Check reachability of the sender for `notification_type`
    pub async fn test_connection(
        &self,
        notification_type: NotificationType,
    ) -> Result<(), ChannelError> {
        self.sender_for(notification_type).test_connection().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannelSender;
    use crate::notification::{Metadata, NotificationStatus};
    use chrono::Utc;

    fn notification(notification_type: NotificationType) -> Notification {
        let now = Utc::now();
        Notification {
            id: 7,
            notification_type,
            status: NotificationStatus::Pending,
            title: "Test Notification".to_string(),
            message: "This is a test notification".to_string(),
            recipient: "test@example.com".to_string(),
            channel: None,
            template_id: None,
            scheduled_at: None,
            sent_at: None,
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn idle_sender() -> Arc<dyn ChannelSender> {
        let mut mock = MockChannelSender::new();
        mock.expect_send().never();
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_routes_by_type() {
        let mut chat = MockChannelSender::new();
        chat.expect_send()
            .withf(|n| n.notification_type == NotificationType::Chat)
            .times(1)
            .returning(|_| Ok(()));

        let dispatcher = ChannelDispatcher::new(idle_sender(), Arc::new(chat), idle_sender());
        let result = dispatcher.dispatch(&notification(NotificationType::Chat)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failure_is_surfaced() {
        let mut email = MockChannelSender::new();
        email
            .expect_send()
            .times(1)
            .returning(|_| Err(ChannelError::Transport("connection refused".to_string())));

        let dispatcher = ChannelDispatcher::new(Arc::new(email), idle_sender(), idle_sender());
        let result = dispatcher.dispatch(&notification(NotificationType::Email)).await;
        assert_eq!(
            result,
            Err(ChannelError::Transport("connection refused".to_string()))
        );
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let mut email = MockChannelSender::new();
        let mut seq = mockall::Sequence::new();
        email
            .expect_send()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(ChannelError::Transport("timeout".to_string())));
        email
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let retry = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            multiplier: 2.0,
            jitter_factor: 0.0,
        };
        let dispatcher =
            ChannelDispatcher::with_retry(Arc::new(email), idle_sender(), idle_sender(), retry);

        assert!(dispatcher
            .dispatch(&notification(NotificationType::Email))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_not_retried() {
        let mut email = MockChannelSender::new();
        email
            .expect_send()
            .times(1)
            .returning(|_| Err(ChannelError::InvalidRecipient("nobody".to_string())));

        let retry = RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 1,
            ..RetryConfig::default()
        };
        let dispatcher =
            ChannelDispatcher::with_retry(Arc::new(email), idle_sender(), idle_sender(), retry);

        assert!(matches!(
            dispatcher.dispatch(&notification(NotificationType::Email)).await,
            Err(ChannelError::InvalidRecipient(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_routes_by_type() {
        let mut in_app = MockChannelSender::new();
        in_app.expect_test_connection().times(1).returning(|| Ok(()));
        let mut chat = MockChannelSender::new();
        chat.expect_test_connection()
            .times(1)
            .returning(|| Err(ChannelError::Rejected("invalid_auth".to_string())));

        let dispatcher = ChannelDispatcher::new(idle_sender(), Arc::new(chat), Arc::new(in_app));
        assert!(dispatcher.test_connection(NotificationType::InApp).await.is_ok());
        assert!(dispatcher.test_connection(NotificationType::Chat).await.is_err());
    }
}
