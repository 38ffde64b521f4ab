//! Backend traits for record storage.
//!
//! Every operation is atomic for the single record it touches. Soft-deleted
//! records are invisible to every read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::channel::Channel;
use crate::notification::{Notification, NotificationFilter, NotificationPatch, NotificationStatus};
use crate::template::Template;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique name is already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be mapped back to a record
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// The configured backend does not exist
    #[error("Unknown store backend: {0}")]
    UnknownBackend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Notification records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new record; the store assigns and returns the id
    async fn create(&self, notification: Notification) -> StoreResult<Notification>;

    async fn get(&self, id: i64) -> StoreResult<Option<Notification>>;

    /// Record the outcome of a dispatch.
    ///
    /// Sets only `status`, `sent_at` and `updated_at`, and only while the
    /// record is live and Pending. Returns `None` otherwise, so a record
    /// resolves to a terminal state at most once and content patched during
    /// the send is kept.
    async fn complete(
        &self,
        id: i64,
        status: NotificationStatus,
        sent_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>>;

    /// Apply a content patch to a live record
    async fn patch(
        &self,
        id: i64,
        patch: NotificationPatch,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>>;

    /// Mark a live record deleted. Returns false if there was nothing to delete.
    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> StoreResult<bool>;

    /// Filtered page, newest first, with the total size of the filtered set
    async fn query(
        &self,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Notification>, i64)>;

    /// Scheduled records with `scheduled_at <= now`, oldest first
    async fn due(&self, now: DateTime<Utc>) -> StoreResult<Vec<Notification>>;

    /// Move a record from Scheduled to Pending.
    ///
    /// Returns the claimed record, or `None` when it is no longer Scheduled
    /// (another caller claimed it, or it was deleted).
    async fn claim_scheduled(&self, id: i64, at: DateTime<Utc>)
        -> StoreResult<Option<Notification>>;

    /// Return claims that never completed to Scheduled.
    ///
    /// A live Pending record with `scheduled_at` set and `updated_at` before
    /// `cutoff` was claimed by a pass that died before recording an outcome.
    /// Returns the number of records requeued.
    async fn requeue_stale(&self, cutoff: DateTime<Utc>, at: DateTime<Utc>) -> StoreResult<u64>;
}

/// Template records, unique by name among live records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn create(&self, template: Template) -> StoreResult<Template>;

    async fn get(&self, id: i64) -> StoreResult<Option<Template>>;

    /// Live templates in id order
    async fn list(&self) -> StoreResult<Vec<Template>>;

    async fn update(&self, template: Template) -> StoreResult<Option<Template>>;

    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> StoreResult<bool>;

    async fn count(&self) -> StoreResult<i64>;
}

/// Channel records, unique by name among live records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelStore: Send + Sync {
    async fn create(&self, channel: Channel) -> StoreResult<Channel>;

    /// Live channels in id order
    async fn list(&self) -> StoreResult<Vec<Channel>>;

    async fn count(&self) -> StoreResult<i64>;
}
