//! Notification templates.
//!
//! This module provides:
//! - Template definition with `{{.Name}}` placeholders
//! - A pure renderer that substitutes caller-supplied bindings
//! - Administration (create, update, delete) over a template store
//!
//! Rendering fails closed: a placeholder without a binding is an error, never
//! an empty string.
//!
//! # Example
//!
//! ```ignore
//! let rendered = render("Hi {{.Name}}", Some("Welcome {{.Name}}"), &json!({"Name": "Ada"}))?;
//! assert_eq!(rendered.body, "Hi Ada");
//! assert_eq!(rendered.subject, "Welcome Ada");
//! ```

mod render;
mod service;
mod types;

pub use render::render;
pub use service::TemplateService;
pub use types::{
    CreateTemplateRequest, Rendered, Template, TemplateError, TemplateListResponse,
    TemplateResult, UpdateTemplateRequest,
};
