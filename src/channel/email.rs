//! Email channel over SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::notification::Notification;

use super::{ChannelError, ChannelSender};

/// Metadata key holding an HTML alternative body
pub const HTML_CONTENT_KEY: &str = "html_content";

pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    host: String,
}

impl EmailSender {
    pub fn new(config: &EmailConfig) -> Result<Self, ChannelError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).map_err(|e| {
                ChannelError::Configuration(format!("SMTP relay error: {}", e))
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.sender().to_string(),
            host: config.host.clone(),
        })
    }
}

/// Build the outgoing message.
///
/// Subject is the notification title and the plain body its message. A
/// string under [`HTML_CONTENT_KEY`] turns the body into a plain/HTML
/// alternative pair.
pub fn build_message(from: &str, notification: &Notification) -> Result<Message, ChannelError> {
    let from: Mailbox = from
        .parse()
        .map_err(|e| ChannelError::Configuration(format!("Invalid from address: {}", e)))?;
    let to: Mailbox = notification
        .recipient
        .trim()
        .parse()
        .map_err(|e| ChannelError::InvalidRecipient(format!("Invalid email address: {}", e)))?;

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(notification.title.clone());

    let message = match notification.metadata_str(HTML_CONTENT_KEY) {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            notification.message.clone(),
            html.to_string(),
        )),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(notification.message.clone()),
    };

    message.map_err(|e| ChannelError::Configuration(format!("Failed to build email: {}", e)))
}

#[async_trait]
impl ChannelSender for EmailSender {
    async fn send(&self, notification: &Notification) -> Result<(), ChannelError> {
        let message = build_message(&self.from, notification)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ChannelError::Transport(format!("failed to send email: {}", e)))?;

        tracing::debug!(
            notification_id = notification.id,
            host = %self.host,
            "Email delivered to SMTP relay"
        );

        Ok(())
    }

    async fn test_connection(&self) -> Result<(), ChannelError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ChannelError::Transport(format!(
                "SMTP server {} did not accept the connection",
                self.host
            ))),
            Err(e) => Err(ChannelError::Transport(format!(
                "failed to connect to SMTP server: {}",
                e
            ))),
        }
    }
}
