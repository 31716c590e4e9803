use sqlx::SqlitePool;

use crate::database::models::AppUser;

/// Queries against the `users` table
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<AppUser>, sqlx::Error> {
        sqlx::query_as::<_, AppUser>("SELECT id, user_name FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<AppUser>, sqlx::Error> {
        sqlx::query_as::<_, AppUser>("SELECT id, user_name FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn exists(&self, user_name: &str) -> Result<bool, sqlx::Error> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE user_name = ?")
            .bind(user_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn insert(&self, user_name: &str) -> Result<AppUser, sqlx::Error> {
        sqlx::query_as::<_, AppUser>(
            "INSERT INTO users (user_name) VALUES (?) RETURNING id, user_name",
        )
        .bind(user_name)
        .fetch_one(&self.pool)
        .await
    }
}
