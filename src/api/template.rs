//! Template CRUD endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::error::Result;
use crate::server::AppState;
use crate::template::{CreateTemplateRequest, Template, TemplateListResponse, UpdateTemplateRequest};

/// POST /api/v1/templates - Create a new template
#[tracing::instrument(name = "http.create_template", skip(state, payload))]
pub async fn create_template(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateTemplateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Template>)> {
    let Json(request) = payload?;
    let created = state.templates.create(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/templates - List all templates
#[tracing::instrument(name = "http.list_templates", skip(state))]
pub async fn list_templates(State(state): State<AppState>) -> Result<Json<TemplateListResponse>> {
    Ok(Json(state.templates.list().await?))
}

/// GET /api/v1/templates/{id} - Get a specific template
#[tracing::instrument(name = "http.get_template", skip(state))]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Template>> {
    Ok(Json(state.templates.get(id).await?))
}

/// PUT /api/v1/templates/{id} - Update an existing template
#[tracing::instrument(name = "http.update_template", skip(state, payload))]
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: std::result::Result<Json<UpdateTemplateRequest>, JsonRejection>,
) -> Result<Json<Template>> {
    let Json(request) = payload?;
    Ok(Json(state.templates.update(id, request).await?))
}

/// DELETE /api/v1/templates/{id} - Delete a template
#[tracing::instrument(name = "http.delete_template", skip(state))]
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.templates.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
