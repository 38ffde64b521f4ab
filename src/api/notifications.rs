//! Notification lifecycle endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorBody, Result};
use crate::notification::{
    Notification, NotificationFilter, NotificationPage, NotificationPatch, NotificationRequest,
    NotificationStatus, NotificationType, ScheduleRequest,
};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> Result<NotificationFilter> {
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<NotificationStatus>().map_err(AppError::Validation)?),
            None => None,
        };
        let notification_type = match self.notification_type.as_deref().filter(|t| !t.is_empty())
        {
            Some(t) => Some(
                t.parse::<NotificationType>()
                    .map_err(|e| AppError::Validation(e.to_string()))?,
            ),
            None => None,
        };

        Ok(NotificationFilter {
            status,
            notification_type,
        })
    }
}

/// Body returned when a notification was stored but could not be delivered
#[derive(Serialize)]
pub struct DispatchFailedResponse {
    pub error: ErrorBody,
    pub notification: Notification,
}

/// POST /api/v1/notifications - Create and send a notification
#[tracing::instrument(name = "http.send_notification", skip(state, payload))]
pub async fn send_notification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NotificationRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let outcome = state.engine.submit(request).await?;

    match outcome.dispatch_error {
        None => Ok((StatusCode::CREATED, Json(outcome.notification)).into_response()),
        Some(e) => {
            let error = AppError::from(e);
            let (status, _, _) = error.parts();
            let body = DispatchFailedResponse {
                error: error.body().error,
                notification: outcome.notification,
            };
            Ok((status, Json(body)).into_response())
        }
    }
}

/// POST /api/v1/notifications/schedule - Create a notification for later delivery
#[tracing::instrument(name = "http.schedule_notification", skip(state, payload))]
pub async fn schedule_notification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Notification>)> {
    let Json(request) = payload?;
    let notification = state
        .engine
        .schedule(request.notification, request.scheduled_at)
        .await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// GET /api/v1/notifications - List notifications
#[tracing::instrument(name = "http.list_notifications", skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<NotificationPage>> {
    let filter = query.filter()?;
    let page = state.engine.list(query.limit, query.offset, filter).await?;
    Ok(Json(page))
}

/// GET /api/v1/notifications/{id}
#[tracing::instrument(name = "http.get_notification", skip(state))]
pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Notification>> {
    Ok(Json(state.engine.get(id).await?))
}

/// PUT /api/v1/notifications/{id} - Update content fields
#[tracing::instrument(name = "http.update_notification", skip(state, payload))]
pub async fn update_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: std::result::Result<Json<NotificationPatch>, JsonRejection>,
) -> Result<Json<Notification>> {
    let Json(patch) = payload?;
    Ok(Json(state.engine.update(id, patch).await?))
}

/// DELETE /api/v1/notifications/{id}
#[tracing::instrument(name = "http.delete_notification", skip(state))]
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.engine.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_filter() {
        let query = ListQuery {
            status: Some("sent".to_string()),
            notification_type: Some("slack".to_string()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.status, Some(NotificationStatus::Sent));
        assert_eq!(filter.notification_type, Some(NotificationType::Chat));

        let empty = ListQuery {
            status: Some(String::new()),
            ..Default::default()
        };
        assert!(empty.filter().unwrap().status.is_none());

        let bad = ListQuery {
            status: Some("delivered".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad.filter(), Err(AppError::Validation(_))));
    }
}
