//! In-app inbox retrieval.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::channel::InboxPage;
use crate::error::{AppError, Result};
use crate::server::AppState;

const DEFAULT_INBOX_PAGE: usize = 20;
const MAX_INBOX_PAGE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// GET /api/v1/inbox/{user} - Newest entries first
#[tracing::instrument(name = "http.get_inbox", skip(state))]
pub async fn get_inbox(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<InboxQuery>,
) -> Json<InboxPage> {
    let limit = match query.limit {
        Some(l) if l > 0 => l.min(MAX_INBOX_PAGE),
        _ => DEFAULT_INBOX_PAGE,
    };
    Json(state.inbox.inbox(&user, limit, query.offset.unwrap_or(0)))
}

/// POST /api/v1/inbox/{user}/{id}/read
#[tracing::instrument(name = "http.mark_read", skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, i64)>,
) -> Result<StatusCode> {
    if state.inbox.mark_read(id, &user) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "notification {} in inbox of {}",
            id, user
        )))
    }
}
