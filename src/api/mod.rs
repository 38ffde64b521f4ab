//! API layer - HTTP endpoint handlers organized by domain.

mod channels;
mod health;
mod inbox;
mod metrics;
mod notifications;
mod routes;
mod template;

// Re-export all handlers for use in server/app.rs
pub use channels::{create_channel, list_channels, test_channel, ChannelListResponse};
pub use health::{health, HealthResponse};
pub use inbox::{get_inbox, mark_read};
pub use metrics::prometheus_metrics;
pub use notifications::{
    delete_notification, get_notification, list_notifications, schedule_notification,
    send_notification, update_notification, DispatchFailedResponse,
};
pub use routes::api_routes;
pub use template::{create_template, delete_template, get_template, list_templates, update_template};
