use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::api_routes;

use super::AppState;

/// CORS for the configured origins; any origin when none are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(allowed)
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server.cors_origins);

    Router::new()
        .merge(api_routes())
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Add state
        .with_state(state)
}
