//! Channel administration and connection tests.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::channel::{Channel, CreateChannelRequest};
use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::notification::NotificationType;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct ChannelListResponse {
    pub channels: Vec<Channel>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct TestChannelRequest {
    #[serde(rename = "type")]
    pub notification_type: String,
}

#[derive(Debug, Serialize)]
pub struct TestChannelResponse {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub status: &'static str,
}

/// POST /api/v1/channels - Register a channel
#[tracing::instrument(name = "http.create_channel", skip(state, payload))]
pub async fn create_channel(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateChannelRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Channel>)> {
    let Json(request) = payload?;
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let channel = request.into_channel(state.clock.now());
    let created = state.stores.channels.create(channel).await?;
    tracing::info!(channel_id = created.id, name = %created.name, "Channel created");

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/channels - List channels
#[tracing::instrument(name = "http.list_channels", skip(state))]
pub async fn list_channels(State(state): State<AppState>) -> Result<Json<ChannelListResponse>> {
    let channels = state.stores.channels.list().await?;
    let total = channels.len();
    Ok(Json(ChannelListResponse { channels, total }))
}

/// POST /api/v1/channels/test - Check that a channel's transport is reachable
#[tracing::instrument(name = "http.test_channel", skip(state, payload))]
pub async fn test_channel(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TestChannelRequest>, JsonRejection>,
) -> Result<Json<TestChannelResponse>> {
    let Json(request) = payload?;
    let notification_type: NotificationType = request
        .notification_type
        .parse()
        .map_err(|e: crate::notification::UnsupportedType| AppError::Validation(e.to_string()))?;

    state.dispatcher.test_connection(notification_type).await?;

    Ok(Json(TestChannelResponse {
        notification_type,
        status: "ok",
    }))
}
