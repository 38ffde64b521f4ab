use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::channels::{create_channel, list_channels, test_channel};
use super::health::health;
use super::inbox::{get_inbox, mark_read};
use super::metrics::prometheus_metrics;
use super::notifications::{
    delete_notification, get_notification, list_notifications, schedule_notification,
    send_notification, update_notification,
};
use super::template::{
    create_template, delete_template, get_template, list_templates, update_template,
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                // Notifications
                .route(
                    "/notifications",
                    post(send_notification).get(list_notifications),
                )
                .route("/notifications/schedule", post(schedule_notification))
                .route(
                    "/notifications/{id}",
                    get(get_notification)
                        .put(update_notification)
                        .delete(delete_notification),
                )
                // Templates
                .route("/templates", post(create_template).get(list_templates))
                .route(
                    "/templates/{id}",
                    get(get_template)
                        .put(update_template)
                        .delete(delete_template),
                )
                // Channels
                .route("/channels", post(create_channel).get(list_channels))
                .route("/channels/test", post(test_channel))
                // In-app inbox
                .route("/inbox/{user}", get(get_inbox))
                .route("/inbox/{user}/{id}/read", post(mark_read)),
        )
}
