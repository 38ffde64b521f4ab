//! Template data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notification::{Metadata, NotificationType};

/// Template-specific error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(i64),

    #[error("Template already exists: {0}")]
    AlreadyExists(String),

    #[error("Template is inactive: {0}")]
    Inactive(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Malformed placeholder: {0}")]
    Malformed(String),

    #[error("Missing template variable: {0}")]
    MissingVariable(String),

    #[error("Invalid template data: {0}")]
    InvalidData(String),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// A named message template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,

    /// Unique template name
    pub name: String,

    /// Channel family the template is written for
    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    /// Rendered into the notification title when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Body with `{{.Name}}` placeholders
    pub content: String,

    /// Expected variable names and a description of each (documentation only)
    #[serde(default)]
    pub variables: Metadata,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Template {
    /// Validate the template
    pub fn validate(&self) -> TemplateResult<()> {
        if self.name.trim().is_empty() || self.name.len() > 128 {
            return Err(TemplateError::InvalidTemplate(
                "Name must be 1-128 characters".to_string(),
            ));
        }

        if self.content.trim().is_empty() {
            return Err(TemplateError::InvalidTemplate(
                "Content must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Subject, if one is declared and non-blank
    pub fn declared_subject(&self) -> Option<&str> {
        self.subject.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Request to create a new template
#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    pub subject: Option<String>,

    pub content: String,

    #[serde(default)]
    pub variables: Option<Metadata>,
}

impl CreateTemplateRequest {
    /// Build an unsaved template; the store assigns the id
    pub fn into_template(self, now: DateTime<Utc>) -> Template {
        Template {
            id: 0,
            name: self.name,
            notification_type: self.notification_type,
            subject: self.subject,
            content: self.content,
            variables: self.variables.unwrap_or_default(),
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Request to update an existing template
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,

    /// Empty string removes the subject
    pub subject: Option<String>,

    pub content: Option<String>,

    pub variables: Option<Metadata>,

    pub is_active: Option<bool>,
}

impl UpdateTemplateRequest {
    /// Apply the changes to `template` and re-validate it
    pub fn apply(self, template: &mut Template, now: DateTime<Utc>) -> TemplateResult<()> {
        if let Some(name) = self.name {
            template.name = name;
        }

        if let Some(notification_type) = self.notification_type {
            template.notification_type = notification_type;
        }

        if let Some(subject) = self.subject {
            template.subject = if subject.is_empty() { None } else { Some(subject) };
        }

        if let Some(content) = self.content {
            template.content = content;
        }

        if let Some(variables) = self.variables {
            template.variables = variables;
        }

        if let Some(is_active) = self.is_active {
            template.is_active = is_active;
        }

        template.updated_at = now;
        template.validate()
    }
}

/// Response for listing templates
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<Template>,
    pub total: usize,
}

/// Output of rendering a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub body: String,
    /// Empty when the template declares no subject
    pub subject: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> Template {
        CreateTemplateRequest {
            name: "welcome_email".to_string(),
            notification_type: NotificationType::Email,
            subject: Some("Welcome!".to_string()),
            content: "Hello {{.Name}}".to_string(),
            variables: None,
        }
        .into_template(now)
    }

    #[test]
    fn test_validate() {
        let now = Utc::now();
        let mut template = sample(now);
        assert!(template.validate().is_ok());

        template.name = " ".to_string();
        assert!(matches!(
            template.validate(),
            Err(TemplateError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_update_clears_subject_and_revalidates() {
        let now = Utc::now();
        let mut template = sample(now);

        let update = UpdateTemplateRequest {
            subject: Some(String::new()),
            is_active: Some(false),
            ..Default::default()
        };
        update.apply(&mut template, now).unwrap();
        assert_eq!(template.declared_subject(), None);
        assert!(!template.is_active);

        let update = UpdateTemplateRequest {
            content: Some("".to_string()),
            ..Default::default()
        };
        assert!(update.apply(&mut template, now).is_err());
    }
}
