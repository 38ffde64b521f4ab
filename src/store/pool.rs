//! PostgreSQL connection pool.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

use super::backend::StoreResult;

/// PostgreSQL connection pool with schema migrations.
#[derive(Clone)]
pub struct PostgresPool {
    /// The underlying connection pool
    pool: PgPool,

    /// Database URL (for logging purposes)
    database_url: String,
}

impl PostgresPool {
    /// Create a new PostgreSQL pool from configuration.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        let pool = Self {
            pool,
            database_url: config.url.clone(),
        };

        tracing::info!(
            pool_size = config.pool_size,
            url = %pool.database_url_masked(),
            "PostgreSQL connection pool created"
        );

        Ok(pool)
    }

    /// Apply pending migrations from `migrations/`.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the database URL (masked for logging).
    pub fn database_url_masked(&self) -> String {
        mask_url(&self.database_url)
    }

    /// Close the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL connection pool closed");
    }
}

/// Replace the password in a connection URL with `***`
pub fn mask_url(url: &str) -> String {
    let authority = url.find("://").map(|i| i + 3).unwrap_or(0);
    if let Some(at_pos) = url[authority..].find('@').map(|i| i + authority) {
        if let Some(colon_pos) = url[authority..at_pos].rfind(':').map(|i| i + authority) {
            let prefix = &url[..colon_pos + 1];
            let suffix = &url[at_pos..];
            return format!("{}***{}", prefix, suffix);
        }
    }
    url.to_string()
}
