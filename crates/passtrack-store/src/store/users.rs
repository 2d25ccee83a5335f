//! User lookup, upsert, and the blocked flag.

use super::{format_ts, parse_ts, Store};
use passtrack_core::error::PasstrackError;
use passtrack_core::user::User;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

impl Store {
    /// Insert a user or refresh their profile fields on conflict.
    pub async fn upsert_user(&self, user: &User) -> Result<(), PasstrackError> {
        sqlx::query(
            "INSERT INTO users (id, first_name, last_name, user_name, is_blocked, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                first_name = excluded.first_name, \
                last_name = excluded.last_name, \
                user_name = excluded.user_name",
        )
        .bind(&user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.user_name)
        .bind(user.is_blocked)
        .bind(format_ts(user.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| PasstrackError::Store(format!("upsert user failed: {e}")))?;

        Ok(())
    }

    pub async fn find_user(&self, id: &str) -> Result<Option<User>, PasstrackError> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, user_name, is_blocked, created_at \
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PasstrackError::Store(format!("find user failed: {e}")))?;

        row.map(|r| user_from_row(&r)).transpose()
    }

    /// Flip the blocked flag (set when the user blocks the bot).
    pub async fn set_user_blocked(&self, id: &str, blocked: bool) -> Result<(), PasstrackError> {
        sqlx::query("UPDATE users SET is_blocked = ? WHERE id = ?")
            .bind(blocked)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PasstrackError::Store(format!("set blocked failed: {e}")))?;

        Ok(())
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, PasstrackError> {
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| PasstrackError::Store(format!("bad column created_at: {e}")))?;

    Ok(User {
        id: column(row, "id")?,
        first_name: column(row, "first_name")?,
        last_name: column(row, "last_name")?,
        user_name: column(row, "user_name")?,
        is_blocked: row
            .try_get("is_blocked")
            .map_err(|e| PasstrackError::Store(format!("bad column is_blocked: {e}")))?,
        created_at: parse_ts(&created_at)?,
    })
}

fn column(row: &SqliteRow, name: &str) -> Result<String, PasstrackError> {
    row.try_get(name)
        .map_err(|e| PasstrackError::Store(format!("bad column {name}: {e}")))
}
