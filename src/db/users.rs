//! User account database operations

use sqlx::SqlitePool;

use crate::error::Result;

/// A stored account. Never rendered; only the hash is read back.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// User repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up a user by exact username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Insert a user unless the username is already taken.
    ///
    /// Returns `true` when a row was written.
    pub async fn insert_if_absent(&self, username: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (username, password_hash)
            VALUES (?, ?)
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of accounts
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
