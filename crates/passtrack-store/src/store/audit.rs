//! Append-only order transition log.
//!
//! Every create, status update, and soft delete writes one row capturing
//! the before/after of the audited status fields. Rows are never mutated
//! or deleted.

use super::{format_ts, parse_ts, Store};
use chrono::Utc;
use passtrack_core::error::PasstrackError;
use passtrack_core::order::{Order, OrderAudit, StatusSnapshot};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

impl Store {
    /// Record an order transition. `old` is absent on create/delete
    /// entries, present with the pre-update snapshot on status updates.
    pub async fn create_audit(
        &self,
        order: &Order,
        user_id: &str,
        old: Option<&StatusSnapshot>,
    ) -> Result<String, PasstrackError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO order_audit \
             (id, order_uid, user_id, old_status_id, new_status_id, \
              old_status_name, new_status_name, \
              old_status_internal_name, new_status_internal_name, \
              old_status_percent, new_status_percent, is_deleted, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&order.uid)
        .bind(user_id)
        .bind(old.and_then(|o| o.status_id))
        .bind(order.status_id)
        .bind(old.and_then(|o| o.status_name.as_deref()))
        .bind(&order.status_name)
        .bind(old.and_then(|o| o.status_internal_name.as_deref()))
        .bind(&order.status_internal_name)
        .bind(old.and_then(|o| o.status_percent))
        .bind(order.status_percent)
        .bind(order.is_deleted)
        .bind(format_ts(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| PasstrackError::Store(format!("audit write failed: {e}")))?;

        debug!("audit: {} {} -> {:?}", order.uid, user_id, order.status_percent);

        Ok(id)
    }

    /// Full audit trail of one order, oldest first.
    pub async fn audits_for_order(&self, uid: &str) -> Result<Vec<OrderAudit>, PasstrackError> {
        let rows = sqlx::query(
            "SELECT id, order_uid, user_id, old_status_id, new_status_id, \
                    old_status_name, new_status_name, \
                    old_status_internal_name, new_status_internal_name, \
                    old_status_percent, new_status_percent, is_deleted, created_at \
             FROM order_audit WHERE order_uid = ? ORDER BY created_at",
        )
        .bind(uid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PasstrackError::Store(format!("audit read failed: {e}")))?;

        rows.iter().map(audit_from_row).collect()
    }
}

fn audit_from_row(row: &SqliteRow) -> Result<OrderAudit, PasstrackError> {
    let created_at: String = get(row, "created_at")?;

    Ok(OrderAudit {
        id: get(row, "id")?,
        order_uid: get(row, "order_uid")?,
        user_id: get(row, "user_id")?,
        old: StatusSnapshot {
            status_id: get(row, "old_status_id")?,
            status_name: get(row, "old_status_name")?,
            status_internal_name: get(row, "old_status_internal_name")?,
            status_percent: get(row, "old_status_percent")?,
        },
        new: StatusSnapshot {
            status_id: get(row, "new_status_id")?,
            status_name: get(row, "new_status_name")?,
            status_internal_name: get(row, "new_status_internal_name")?,
            status_percent: get(row, "new_status_percent")?,
        },
        is_deleted: get(row, "is_deleted")?,
        created_at: parse_ts(&created_at)?,
    })
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, PasstrackError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| PasstrackError::Store(format!("bad column {column}: {e}")))
}
