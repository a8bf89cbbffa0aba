use anyhow::Context;
use sqlx::SqlitePool;
use time::{OffsetDateTime, UtcOffset};

use super::repo_types::{CalorieEntry, CalorieEntryPatch, NewCalorieEntry};

/// Timestamps are stored as text and compared as text, so every value is
/// written in UTC.
fn utc(t: OffsetDateTime) -> OffsetDateTime {
    t.to_offset(UtcOffset::UTC)
}

const ENTRY_COLUMNS: &str = "id, user_id, calories, food_name, food_type, quantity, unit, \
                             source, image_path, notes, logged_at, created_at, updated_at";

/// Insert one entry and return the stored row.
pub async fn insert(db: &SqlitePool, entry: &NewCalorieEntry) -> anyhow::Result<CalorieEntry> {
    let now = OffsetDateTime::now_utc();
    let row = sqlx::query_as::<_, CalorieEntry>(&format!(
        r#"
        INSERT INTO calories
            (user_id, calories, food_name, food_type, quantity, unit, source,
             image_path, notes, logged_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {ENTRY_COLUMNS}
        "#
    ))
    .bind(entry.user_id)
    .bind(entry.calories)
    .bind(&entry.food_name)
    .bind(&entry.food_type)
    .bind(entry.quantity)
    .bind(&entry.unit)
    .bind(entry.source)
    .bind(&entry.image_path)
    .bind(&entry.notes)
    .bind(utc(entry.logged_at))
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await
    .context("insert calorie entry")?;
    Ok(row)
}

pub async fn get(db: &SqlitePool, user_id: i64, id: i64) -> anyhow::Result<Option<CalorieEntry>> {
    let row = sqlx::query_as::<_, CalorieEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM calories WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("get calorie entry")?;
    Ok(row)
}

/// Most recent first.
pub async fn list_by_user(
    db: &SqlitePool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<CalorieEntry>> {
    let rows = sqlx::query_as::<_, CalorieEntry>(&format!(
        r#"
        SELECT {ENTRY_COLUMNS}
        FROM calories
        WHERE user_id = ?
        ORDER BY logged_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list calorie entries")?;
    Ok(rows)
}

/// Entries logged at or after `since`, oldest first.
pub async fn list_since(
    db: &SqlitePool,
    user_id: i64,
    since: OffsetDateTime,
) -> anyhow::Result<Vec<CalorieEntry>> {
    let rows = sqlx::query_as::<_, CalorieEntry>(&format!(
        r#"
        SELECT {ENTRY_COLUMNS}
        FROM calories
        WHERE user_id = ? AND logged_at >= ?
        ORDER BY logged_at ASC
        "#
    ))
    .bind(user_id)
    .bind(utc(since))
    .fetch_all(db)
    .await
    .context("list calorie entries since")?;
    Ok(rows)
}

pub async fn update(
    db: &SqlitePool,
    user_id: i64,
    id: i64,
    patch: &CalorieEntryPatch,
) -> anyhow::Result<Option<CalorieEntry>> {
    let row = sqlx::query_as::<_, CalorieEntry>(&format!(
        r#"
        UPDATE calories
        SET calories   = COALESCE(?, calories),
            food_name  = COALESCE(?, food_name),
            food_type  = COALESCE(?, food_type),
            quantity   = COALESCE(?, quantity),
            unit       = COALESCE(?, unit),
            notes      = COALESCE(?, notes),
            logged_at  = COALESCE(?, logged_at),
            updated_at = ?
        WHERE id = ? AND user_id = ?
        RETURNING {ENTRY_COLUMNS}
        "#
    ))
    .bind(patch.calories)
    .bind(&patch.food_name)
    .bind(&patch.food_type)
    .bind(patch.quantity)
    .bind(&patch.unit)
    .bind(&patch.notes)
    .bind(patch.logged_at.map(utc))
    .bind(OffsetDateTime::now_utc())
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("update calorie entry")?;
    Ok(row)
}

/// Returns false when no entry with that id belongs to the user.
pub async fn delete(db: &SqlitePool, user_id: i64, id: i64) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM calories WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete calorie entry")?;
    Ok(res.rows_affected() > 0)
}
