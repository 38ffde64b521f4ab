//! PostgreSQL store backends.
//!
//! Tables are created by the migrations in `migrations/`. Uniqueness of live
//! template and channel names is enforced by partial unique indexes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::channel::Channel;
use crate::notification::{
    Metadata, Notification, NotificationFilter, NotificationPatch, NotificationStatus,
};
use crate::template::Template;

use super::backend::{ChannelStore, NotificationStore, StoreError, StoreResult, TemplateStore};

const NOTIFICATION_COLUMNS: &str = "id, type, status, title, message, recipient, channel, \
     template_id, scheduled_at, sent_at, metadata, created_at, updated_at, deleted_at";

const TEMPLATE_COLUMNS: &str =
    "id, name, type, subject, content, variables, is_active, created_at, updated_at, deleted_at";

const CHANNEL_COLUMNS: &str = "id, name, type, config, is_active, created_at, updated_at, deleted_at";

/// Map a unique-index violation to `Conflict`
fn conflict_or(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{} already exists", what))
        }
        _ => StoreError::Postgres(err),
    }
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: i64,
    #[sqlx(rename = "type")]
    notification_type: String,
    status: String,
    title: String,
    message: String,
    recipient: String,
    channel: Option<String>,
    template_id: Option<i64>,
    scheduled_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    metadata: Json<Metadata>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            notification_type: row
                .notification_type
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("notification {}: {}", row.id, e)))?,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("notification {}: {}", row.id, e)))?,
            title: row.title,
            message: row.message,
            recipient: row.recipient,
            channel: row.channel,
            template_id: row.template_id,
            scheduled_at: row.scheduled_at,
            sent_at: row.sent_at,
            metadata: row.metadata.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TemplateRow {
    id: i64,
    name: String,
    #[sqlx(rename = "type")]
    notification_type: String,
    subject: Option<String>,
    content: String,
    variables: Json<Metadata>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<TemplateRow> for Template {
    type Error = StoreError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        Ok(Template {
            id: row.id,
            name: row.name,
            notification_type: row
                .notification_type
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("template {}: {}", row.id, e)))?,
            subject: row.subject,
            content: row.content,
            variables: row.variables.0,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ChannelRow {
    id: i64,
    name: String,
    #[sqlx(rename = "type")]
    notification_type: String,
    config: Json<Metadata>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ChannelRow> for Channel {
    type Error = StoreError;

    fn try_from(row: ChannelRow) -> Result<Self, Self::Error> {
        Ok(Channel {
            id: row.id,
            name: row.name,
            notification_type: row
                .notification_type
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("channel {}: {}", row.id, e)))?,
            config: row.config.0,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// PostgreSQL notification store
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn create(&self, notification: Notification) -> StoreResult<Notification> {
        let sql = format!(
            r#"
            INSERT INTO notifications (type, status, title, message, recipient, channel,
                template_id, scheduled_at, sent_at, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        let row: NotificationRow = sqlx::query_as(&sql)
            .bind(notification.notification_type.as_str())
            .bind(notification.status.as_str())
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(&notification.recipient)
            .bind(&notification.channel)
            .bind(notification.template_id)
            .bind(notification.scheduled_at)
            .bind(notification.sent_at)
            .bind(Json(&notification.metadata))
            .bind(notification.created_at)
            .bind(notification.updated_at)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn get(&self, id: i64) -> StoreResult<Option<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE id = $1 AND deleted_at IS NULL",
            NOTIFICATION_COLUMNS
        );

        let row: Option<NotificationRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Notification::try_from).transpose()
    }

    async fn complete(
        &self,
        id: i64,
        status: NotificationStatus,
        sent_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>> {
        let sql = format!(
            r#"
            UPDATE notifications
            SET status = $2, sent_at = $3, updated_at = $4
            WHERE id = $1 AND status = $5 AND deleted_at IS NULL
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        let row: Option<NotificationRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(sent_at)
            .bind(at)
            .bind(NotificationStatus::Pending.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Notification::try_from).transpose()
    }

    async fn patch(
        &self,
        id: i64,
        patch: NotificationPatch,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {} FROM notifications WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            NOTIFICATION_COLUMNS
        );
        let row: Option<NotificationRow> = sqlx::query_as(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut notification = Notification::try_from(row)?;
        patch.apply(&mut notification, at);

        sqlx::query(
            r#"
            UPDATE notifications
            SET title = $2, message = $3, recipient = $4, channel = $5, metadata = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.recipient)
        .bind(&notification.channel)
        .bind(Json(&notification.metadata))
        .bind(notification.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(notification))
    }

    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(
        &self,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Notification>, i64)> {
        let status = filter.status.map(|s| s.as_str());
        let notification_type = filter.notification_type.map(|t| t.as_str());

        let sql = format!(
            r#"
            SELECT {} FROM notifications
            WHERE deleted_at IS NULL
              AND ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR type = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
            NOTIFICATION_COLUMNS
        );

        let rows: Vec<NotificationRow> = sqlx::query_as(&sql)
            .bind(status)
            .bind(notification_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE deleted_at IS NULL
              AND ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR type = $2)
            "#,
        )
        .bind(status)
        .bind(notification_type)
        .fetch_one(&self.pool)
        .await?;

        Ok((convert_all(rows)?, total))
    }

    async fn due(&self, now: DateTime<Utc>) -> StoreResult<Vec<Notification>> {
        let sql = format!(
            r#"
            SELECT {} FROM notifications
            WHERE deleted_at IS NULL AND status = $1 AND scheduled_at <= $2
            ORDER BY scheduled_at ASC, id ASC
            "#,
            NOTIFICATION_COLUMNS
        );

        let rows: Vec<NotificationRow> = sqlx::query_as(&sql)
            .bind(NotificationStatus::Scheduled.as_str())
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows)
    }

    async fn claim_scheduled(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>> {
        let sql = format!(
            r#"
            UPDATE notifications
            SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        let row: Option<NotificationRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(NotificationStatus::Scheduled.as_str())
            .bind(NotificationStatus::Pending.as_str())
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Notification::try_from).transpose()
    }

    async fn requeue_stale(&self, cutoff: DateTime<Utc>, at: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = $1, updated_at = $4
            WHERE status = $2 AND scheduled_at IS NOT NULL AND updated_at < $3
              AND deleted_at IS NULL
            "#,
        )
        .bind(NotificationStatus::Scheduled.as_str())
        .bind(NotificationStatus::Pending.as_str())
        .bind(cutoff)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// PostgreSQL template store
pub struct PostgresTemplateStore {
    pool: PgPool,
}

impl PostgresTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for PostgresTemplateStore {
    async fn create(&self, template: Template) -> StoreResult<Template> {
        let sql = format!(
            r#"
            INSERT INTO templates (name, type, subject, content, variables, is_active,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            TEMPLATE_COLUMNS
        );

        let row: TemplateRow = sqlx::query_as(&sql)
            .bind(&template.name)
            .bind(template.notification_type.as_str())
            .bind(&template.subject)
            .bind(&template.content)
            .bind(Json(&template.variables))
            .bind(template.is_active)
            .bind(template.created_at)
            .bind(template.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or(e, &format!("template {}", template.name)))?;

        row.try_into()
    }

    async fn get(&self, id: i64) -> StoreResult<Option<Template>> {
        let sql = format!(
            "SELECT {} FROM templates WHERE id = $1 AND deleted_at IS NULL",
            TEMPLATE_COLUMNS
        );

        let row: Option<TemplateRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Template::try_from).transpose()
    }

    async fn list(&self) -> StoreResult<Vec<Template>> {
        let sql = format!(
            "SELECT {} FROM templates WHERE deleted_at IS NULL ORDER BY id",
            TEMPLATE_COLUMNS
        );

        let rows: Vec<TemplateRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        convert_all(rows)
    }

    async fn update(&self, template: Template) -> StoreResult<Option<Template>> {
        let sql = format!(
            r#"
            UPDATE templates
            SET name = $2, type = $3, subject = $4, content = $5, variables = $6,
                is_active = $7, updated_at = $8
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            TEMPLATE_COLUMNS
        );

        let row: Option<TemplateRow> = sqlx::query_as(&sql)
            .bind(template.id)
            .bind(&template.name)
            .bind(template.notification_type.as_str())
            .bind(&template.subject)
            .bind(&template.content)
            .bind(Json(&template.variables))
            .bind(template.is_active)
            .bind(template.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_or(e, &format!("template {}", template.name)))?;

        row.map(Template::try_from).transpose()
    }

    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE templates SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM templates WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

/// PostgreSQL channel store
pub struct PostgresChannelStore {
    pool: PgPool,
}

impl PostgresChannelStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelStore for PostgresChannelStore {
    async fn create(&self, channel: Channel) -> StoreResult<Channel> {
        let sql = format!(
            r#"
            INSERT INTO channels (name, type, config, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            CHANNEL_COLUMNS
        );

        let row: ChannelRow = sqlx::query_as(&sql)
            .bind(&channel.name)
            .bind(channel.notification_type.as_str())
            .bind(Json(&channel.config))
            .bind(channel.is_active)
            .bind(channel.created_at)
            .bind(channel.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or(e, &format!("channel {}", channel.name)))?;

        row.try_into()
    }

    async fn list(&self) -> StoreResult<Vec<Channel>> {
        let sql = format!(
            "SELECT {} FROM channels WHERE deleted_at IS NULL ORDER BY id",
            CHANNEL_COLUMNS
        );

        let rows: Vec<ChannelRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        convert_all(rows)
    }

    async fn count(&self) -> StoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM channels WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
