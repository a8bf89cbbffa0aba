use sqlx::SqlitePool;
use thiserror::Error;
use time::OffsetDateTime;

use crate::auth::repo_types::User;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

/// Failure writing a user row.
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Email already registered")]
    EmailTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for UserStoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            let msg = db_err.message();
            if msg.contains("UNIQUE constraint failed: users.username") {
                return UserStoreError::UsernameTaken;
            }
            if msg.contains("UNIQUE constraint failed: users.email") {
                return UserStoreError::EmailTaken;
            }
        }
        UserStoreError::Other(e.into())
    }
}

impl User {
    /// Find a user by username.
    pub async fn find_by_username(db: &SqlitePool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, UserStoreError> {
        let now = OffsetDateTime::now_utc();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Change email and/or password hash; `None` keeps the stored value.
    pub async fn update_profile(
        db: &SqlitePool,
        id: i64,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, UserStoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = COALESCE(?, email),
                password_hash = COALESCE(?, password_hash),
                updated_at = ?
            WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Delete the user; their calorie entries go with them.
    pub async fn delete(db: &SqlitePool, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
