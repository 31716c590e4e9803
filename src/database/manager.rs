use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_name TEXT NOT NULL UNIQUE COLLATE NOCASE
    )
"#;

/// Connection pool setup and schema bootstrap for the application database
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open the pool described by `config`, creating the database file if needed.
    pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
        let options = SqliteConnectOptions::from_str(&config.connection_string)
            .map_err(|e| DatabaseError::InvalidConnectionString(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(pool)
    }

    /// Create tables that don't exist yet
    pub async fn migrate(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::query(SCHEMA)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Single-connection in-memory database with the schema applied
    pub async fn memory_pool() -> SqlitePool {
        let pool = DatabaseManager::connect(&DatabaseConfig {
            connection_string: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
        .unwrap();
        DatabaseManager::migrate(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn connects_and_migrates_twice() {
        let pool = memory_pool().await;
        DatabaseManager::migrate(&pool).await.unwrap();
        DatabaseManager::health_check(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_unparseable_connection_string() {
        let err = DatabaseManager::connect(&DatabaseConfig {
            connection_string: "sqlite://app.db?flavour=strawberry".to_string(),
            max_connections: 1,
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidConnectionString(_)));
    }
}
