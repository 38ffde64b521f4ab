use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::channel::ChannelError;
use crate::notification::EngineError;
use crate::store::StoreError;
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl AppError {
    /// Status, error code, and the message safe to show a client
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Configuration error".to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "DISPATCH_FAILED", msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }

    pub fn body(&self) -> ErrorResponse {
        let (_, code, message) = self.parts();
        ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => AppError::Validation(msg),
            EngineError::NotFound(id) => AppError::NotFound(format!("notification {}", id)),
            EngineError::Template(e) => e.into(),
            EngineError::Dispatch(e) => e.into(),
            EngineError::UnsupportedType(e) => AppError::Validation(e.to_string()),
            EngineError::Store(e) => e.into(),
        }
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound(id) => AppError::NotFound(format!("template {}", id)),
            TemplateError::AlreadyExists(_) => AppError::Conflict(err.to_string()),
            _ => AppError::Validation(err.to_string()),
        }
    }
}

impl From<ChannelError> for AppError {
    fn from(err: ChannelError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, _) = self.parts();

        // Always log the detailed error server-side
        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %self,
                "API error"
            );
        } else {
            tracing::debug!(
                code = %code,
                status = %status.as_u16(),
                message = %self,
                "API error"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_status_mapping() {
        let cases = [
            (EngineError::Validation("title is required".into()), StatusCode::BAD_REQUEST),
            (EngineError::NotFound(7), StatusCode::NOT_FOUND),
            (
                EngineError::Template(TemplateError::MissingVariable("Name".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::Template(TemplateError::NotFound(3)),
                StatusCode::NOT_FOUND,
            ),
            (
                EngineError::Dispatch(ChannelError::Transport("refused".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                EngineError::UnsupportedType(crate::notification::UnsupportedType("sms".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::Store(StoreError::Corrupt("row 1".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let app: AppError = err.into();
            assert_eq!(app.parts().0, expected, "{:?}", app);
        }
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let app: AppError = StoreError::Corrupt("password=hunter2".into()).into();
        let (_, code, message) = app.parts();
        assert_eq!(code, "INTERNAL_ERROR");
        assert!(!message.contains("hunter2"));
    }

    #[test]
    fn test_store_conflict_is_409() {
        let app: AppError = StoreError::Conflict("template welcome_email".into()).into();
        assert_eq!(app.parts().0, StatusCode::CONFLICT);
    }
}
