//! HTTP API integration tests
//!
//! Build the full router over in-memory stores and fake transports, then
//! drive it request by request.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use ara_notification_engine::channel::{ChannelDispatcher, ChannelError, ChannelSender, InAppSender};
use ara_notification_engine::clock::{Clock, ManualClock};
use ara_notification_engine::config::Settings;
use ara_notification_engine::notification::Notification;
use ara_notification_engine::server::{create_app, AppState};
use ara_notification_engine::store::Stores;

/// Transport that always succeeds
struct Reachable;

#[async_trait]
impl ChannelSender for Reachable {
    async fn send(&self, _notification: &Notification) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Transport that can never be reached
struct Unreachable;

#[async_trait]
impl ChannelSender for Unreachable {
    async fn send(&self, _notification: &Notification) -> Result<(), ChannelError> {
        Err(ChannelError::Transport("connection refused".to_string()))
    }

    async fn test_connection(&self) -> Result<(), ChannelError> {
        Err(ChannelError::Transport("connection refused".to_string()))
    }
}

/// Email is unreachable, chat is reachable, in-app is the real inbox
fn create_test_app() -> Router {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap(),
    ));
    let settings = Settings::default();
    let inbox = Arc::new(InAppSender::new(settings.in_app.clone(), clock.clone()));
    let dispatcher = ChannelDispatcher::new(Arc::new(Unreachable), Arc::new(Reachable), inbox.clone());

    let state = AppState::with_components(settings, Stores::memory(), dispatcher, inbox, clock);
    create_app(state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn chat_body() -> Value {
    json!({
        "type": "slack",
        "title": "Deploy",
        "message": "Deploy finished",
        "recipient": "#deploys"
    })
}

#[tokio::test]
async fn test_send_notification_created() {
    let app = create_test_app();

    let (status, body) = call(&app, Method::POST, "/api/v1/notifications", Some(chat_body())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "sent");
    assert_eq!(body["type"], "slack");
    assert!(body["sent_at"].is_string());
}

#[tokio::test]
async fn test_send_notification_dispatch_failure() {
    let app = create_test_app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/notifications",
        Some(json!({
            "type": "email",
            "title": "Hello",
            "message": "World",
            "recipient": "user@example.com"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "DISPATCH_FAILED");
    assert_eq!(body["notification"]["status"], "failed");
    assert!(body["notification"]["sent_at"].is_null());

    // The failed record is still retrievable
    let id = body["notification"]["id"].as_i64().unwrap();
    let (status, body) = call(&app, Method::GET, &format!("/api/v1/notifications/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_send_notification_rejects_bad_input() {
    let app = create_test_app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/notifications",
        Some(json!({"type": "sms", "title": "t", "message": "m", "recipient": "r"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/notifications",
        Some(json!({"type": "slack", "title": "", "message": "m", "recipient": "r"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/notifications",
        Some(json!({"type": "slack", "title": "t", "message": "m", "recipient": "r", "template_id": 999})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_schedule_update_and_delete() {
    let app = create_test_app();

    let mut request = chat_body();
    request["scheduled_at"] = json!("2030-06-01T13:00:00Z");
    let (status, body) = call(&app, Method::POST, "/api/v1/notifications/schedule", Some(request)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "scheduled");
    let id = body["id"].as_i64().unwrap();
    let uri = format!("/api/v1/notifications/{id}");

    let (status, body) = call(&app, Method::PUT, &uri, Some(json!({"title": "Deploy v2"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Deploy v2");
    assert_eq!(body["status"], "scheduled");

    // Lifecycle fields are not patchable
    let (status, _) = call(&app, Method::PUT, &uri, Some(json!({"status": "sent"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, body) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_notifications_with_filter() {
    let app = create_test_app();

    for _ in 0..3 {
        call(&app, Method::POST, "/api/v1/notifications", Some(chat_body())).await;
    }
    call(
        &app,
        Method::POST,
        "/api/v1/notifications",
        Some(json!({"type": "email", "title": "t", "message": "m", "recipient": "a@example.com"})),
    )
    .await;

    let (status, body) = call(&app, Method::GET, "/api/v1/notifications?status=sent&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["notifications"].as_array().unwrap().len(), 2);

    let (_, body) = call(&app, Method::GET, "/api/v1/notifications?type=email", None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["notifications"][0]["status"], "failed");

    let (status, _) = call(&app, Method::GET, "/api/v1/notifications?status=delivered", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_template_lifecycle() {
    let app = create_test_app();
    let template = json!({
        "name": "deploy_done",
        "type": "slack",
        "subject": "Deploy of {{.Service}}",
        "content": "{{.Service}} is live"
    });

    let (status, created) = call(&app, Method::POST, "/api/v1/templates", Some(template.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, body) = call(&app, Method::POST, "/api/v1/templates", Some(template)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/notifications",
        Some(json!({
            "type": "slack",
            "title": "placeholder",
            "message": "placeholder",
            "recipient": "#deploys",
            "template_id": id,
            "template_data": {"Service": "billing"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "billing is live");
    assert_eq!(body["title"], "Deploy of billing");

    // Missing binding fails closed
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/notifications",
        Some(json!({
            "type": "slack",
            "title": "placeholder",
            "message": "placeholder",
            "recipient": "#deploys",
            "template_id": id,
            "template_data": {}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, Method::GET, "/api/v1/templates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let uri = format!("/api/v1/templates/{id}");
    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_channels_endpoints() {
    let app = create_test_app();

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/channels",
        Some(json!({"name": "ops_slack", "type": "slack", "config": {"channel": "#ops"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&app, Method::GET, "/api/v1/channels", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = call(&app, Method::POST, "/api/v1/channels/test", Some(json!({"type": "slack"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = call(&app, Method::POST, "/api/v1/channels/test", Some(json!({"type": "email"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_inbox_and_mark_read() {
    let app = create_test_app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/notifications",
        Some(json!({
            "type": "in_app",
            "title": "New comment",
            "message": "Ada replied",
            "recipient": "user-7"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();

    let (status, body) = call(&app, Method::GET, "/api/v1/inbox/user-7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["unread"], 1);

    let (status, _) = call(&app, Method::POST, &format!("/api/v1/inbox/user-7/{id}/read"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = call(&app, Method::GET, "/api/v1/inbox/user-7", None).await;
    assert_eq!(body["unread"], 0);

    let (status, _) = call(&app, Method::POST, "/api/v1/inbox/user-8/1/read", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = create_test_app();

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["scheduler"]["running"], false);

    call(&app, Method::POST, "/api/v1/notifications", Some(chat_body())).await;
    let response = tokio_test::assert_ok!(
        app.clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
    );
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("notifications_created_total"));
}
