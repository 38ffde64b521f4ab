//! Prometheus metrics endpoint.

use axum::{http::StatusCode, response::IntoResponse};

use crate::metrics;

/// GET /metrics - Prometheus metrics endpoint
pub async fn prometheus_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics::encode_metrics(),
    )
}
