//! Record storage for notifications, templates, and channels.
//!
//! # Backends
//!
//! - `memory`: DashMap-backed stores, lost on restart (default)
//! - `postgres`: sqlx over a PostgreSQL pool, schema from `migrations/`
//!
//! Use [`create_stores`] to build the backend selected by configuration.

mod backend;
mod memory_backend;
mod pool;
mod postgres_backend;
mod seed;

use std::sync::Arc;

use crate::config::DatabaseConfig;

pub use backend::{ChannelStore, NotificationStore, StoreError, StoreResult, TemplateStore};
#[cfg(test)]
pub use backend::{MockChannelStore, MockNotificationStore, MockTemplateStore};
pub use memory_backend::{MemoryChannelStore, MemoryNotificationStore, MemoryTemplateStore};
pub use pool::{mask_url, PostgresPool};
pub use postgres_backend::{PostgresChannelStore, PostgresNotificationStore, PostgresTemplateStore};
pub use seed::seed_defaults;

/// The three record stores, sharing one backend
#[derive(Clone)]
pub struct Stores {
    pub notifications: Arc<dyn NotificationStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub channels: Arc<dyn ChannelStore>,
    pool: Option<PostgresPool>,
}

impl Stores {
    /// In-memory stores
    pub fn memory() -> Self {
        Self {
            notifications: Arc::new(MemoryNotificationStore::new()),
            templates: Arc::new(MemoryTemplateStore::new()),
            channels: Arc::new(MemoryChannelStore::new()),
            pool: None,
        }
    }

    /// PostgreSQL stores sharing `pool`
    pub fn postgres(pool: PostgresPool) -> Self {
        let pg = pool.pool().clone();
        Self {
            notifications: Arc::new(PostgresNotificationStore::new(pg.clone())),
            templates: Arc::new(PostgresTemplateStore::new(pg.clone())),
            channels: Arc::new(PostgresChannelStore::new(pg)),
            pool: Some(pool),
        }
    }

    /// Backend name, for logging and health output
    pub fn backend(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    /// Check that the backend answers
    pub async fn ping(&self) -> StoreResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool.pool()).await?;
        }
        Ok(())
    }

    /// Release backend resources
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

/// Create stores based on configuration.
///
/// Returns the backend selected by the `backend` setting:
/// - `"postgres"`: connects, runs migrations, and returns PostgreSQL stores
/// - `"memory"` (default): returns in-memory stores
///
/// Unknown backend names are an error.
pub async fn create_stores(config: &DatabaseConfig) -> StoreResult<Stores> {
    match config.backend.as_str() {
        "postgres" => {
            let pool = PostgresPool::connect(config).await?;
            pool.migrate().await?;
            tracing::info!(
                backend = "postgres",
                url = %pool.database_url_masked(),
                "Creating PostgreSQL stores"
            );
            Ok(Stores::postgres(pool))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating in-memory stores");
            Ok(Stores::memory())
        }
        other => {
            tracing::error!(backend = %other, "Unknown store backend");
            Err(StoreError::UnknownBackend(other.to_string()))
        }
    }
}
