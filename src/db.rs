use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open the SQLite pool. Foreign keys are switched on so deleting a user
/// cascades to their calorie entries.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parse database url {}", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("connect to database")
}

pub async fn migrate(db: &SqlitePool) -> anyhow::Result<()> {
    MIGRATOR.run(db).await.context("run migrations")?;
    Ok(())
}

/// In-memory database with the schema applied. A single connection keeps
/// every query on the same memory database.
#[cfg(test)]
pub async fn memory() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("memory url")
        .foreign_keys(true);
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("open memory db");
    migrate(&db).await.expect("migrations apply");
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_create_both_tables() {
        let db = memory().await;
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'calories') ORDER BY name",
        )
        .fetch_all(&db)
        .await
        .unwrap();
        let names: Vec<_> = tables.into_iter().map(|(n,)| n).collect();
        assert_eq!(names, vec!["calories".to_string(), "users".to_string()]);
    }

    #[tokio::test]
    async fn source_check_rejects_unknown_values() {
        let db = memory().await;
        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES ('a_user', 'a@b.co', 'x')")
            .execute(&db)
            .await
            .unwrap();
        let err = sqlx::query("INSERT INTO calories (user_id, calories, source) VALUES (1, 100, 'guess')")
            .execute(&db)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("CHECK constraint failed"));
    }
}
