use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::models::UserRecord;
use crate::db::store::UserStore;
use crate::error::DatabaseError;

/// Postgres-backed user store. `username` is the primary key of `users`,
/// so uniqueness is enforced by the database.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: Arc<PgPool>,
}

impl PgUserStore {
    /// Connect, then apply the embedded migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("User store connected with up to {} connections", config.max_connections);

        Ok(Self { pool: Arc::new(pool) })
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &UserRecord) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO users (username, password_hash, email) VALUES ($1, $2, $3)")
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT username, password_hash, email FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn delete_by_username(&self, username: &str) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
