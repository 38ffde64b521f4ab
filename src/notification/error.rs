use thiserror::Error;

use crate::channel::ChannelError;
use crate::store::StoreError;
use crate::template::TemplateError;

use super::types::UnsupportedType;

/// Errors surfaced by the notification engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request failed validation; nothing was persisted
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notification not found: {0}")]
    NotFound(i64),

    /// Template lookup or rendering failed; nothing was persisted
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Transport failed after the record was persisted as `Failed`
    #[error(transparent)]
    Dispatch(#[from] ChannelError),

    #[error(transparent)]
    UnsupportedType(#[from] UnsupportedType),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
