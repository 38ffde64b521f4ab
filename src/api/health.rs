//! Health check endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: StoreHealthResponse,
    pub scheduler: SchedulerHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct StoreHealthResponse {
    pub backend: String,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct SchedulerHealthResponse {
    pub running: bool,
    pub interval_seconds: u64,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = match state.stores.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    let (status_code, status) = if connected {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        store: StoreHealthResponse {
            backend: state.stores.backend().to_string(),
            connected,
        },
        scheduler: SchedulerHealthResponse {
            running: state.scheduler.is_running().await,
            interval_seconds: state.settings.scheduler.interval_seconds,
        },
    };

    (status_code, Json(body))
}
