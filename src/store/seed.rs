//! Stock templates and channels for a fresh install.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::channel::CreateChannelRequest;
use crate::notification::{Metadata, NotificationType};
use crate::template::CreateTemplateRequest;

use super::backend::StoreResult;
use super::Stores;

fn string_vars(names: &[&str]) -> Metadata {
    names
        .iter()
        .map(|name| (name.to_string(), json!("string")))
        .collect()
}

fn default_templates() -> Vec<CreateTemplateRequest> {
    vec![
        CreateTemplateRequest {
            name: "welcome_email".to_string(),
            notification_type: NotificationType::Email,
            subject: Some("Welcome to our platform!".to_string()),
            content: "Hello {{.Name}},\n\nWelcome to our platform! We're excited to have you on board.\n\nBest regards,\nThe Team".to_string(),
            variables: Some(string_vars(&["Name"])),
        },
        CreateTemplateRequest {
            name: "password_reset".to_string(),
            notification_type: NotificationType::Email,
            subject: Some("Password Reset Request".to_string()),
            content: "Hello {{.Name}},\n\nYou requested a password reset. Click the link below to reset your password:\n\n{{.ResetLink}}\n\nIf you didn't request this, please ignore this email.\n\nBest regards,\nThe Team".to_string(),
            variables: Some(string_vars(&["Name", "ResetLink"])),
        },
        CreateTemplateRequest {
            name: "slack_alert".to_string(),
            notification_type: NotificationType::Chat,
            subject: None,
            content: ":rotating_light: Alert: {{.AlertType}}\n\n{{.Message}}\n\nTime: {{.Timestamp}}\nSeverity: {{.Severity}}".to_string(),
            variables: Some(string_vars(&["AlertType", "Message", "Timestamp", "Severity"])),
        },
        CreateTemplateRequest {
            name: "in_app_notification".to_string(),
            notification_type: NotificationType::InApp,
            subject: None,
            content: "{{.Title}}\n\n{{.Message}}\n\n{{.ActionText}}: {{.ActionUrl}}".to_string(),
            variables: Some(string_vars(&["Title", "Message", "ActionText", "ActionUrl"])),
        },
    ]
}

fn default_channels() -> Vec<CreateChannelRequest> {
    [
        ("default_email", NotificationType::Email),
        ("default_slack", NotificationType::Chat),
        ("default_in_app", NotificationType::InApp),
    ]
    .into_iter()
    .map(|(name, notification_type)| CreateChannelRequest {
        name: name.to_string(),
        notification_type,
        config: Metadata::new(),
    })
    .collect()
}

/// Insert the stock templates and channels when no template exists yet.
///
/// Returns true if anything was inserted.
pub async fn seed_defaults(stores: &Stores, now: DateTime<Utc>) -> StoreResult<bool> {
    if stores.templates.count().await? > 0 {
        tracing::debug!("Templates present, skipping default seed");
        return Ok(false);
    }

    for request in default_templates() {
        stores.templates.create(request.into_template(now)).await?;
    }

    if stores.channels.count().await? == 0 {
        for request in default_channels() {
            stores.channels.create(request.into_channel(now)).await?;
        }
    }

    tracing::info!("Seeded default templates and channels");
    Ok(true)
}
