//! Order CRUD and the active-set query the autoupdate run polls.

use super::{format_ts, parse_ts, Store};
use chrono::Utc;
use passtrack_core::error::PasstrackError;
use passtrack_core::order::Order;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const ORDER_COLUMNS: &str = "uid, short_uid, user_id, source_uid, reception_date, \
     status_id, status_name, status_description, status_color, status_subscription, \
     status_internal_name, status_percent, is_deleted, created_at, updated_at";

impl Store {
    /// Insert a new tracked order. Status fields start empty; they are
    /// filled by the first successful upstream lookup.
    pub async fn create_order(
        &self,
        uid: &str,
        short_uid: &str,
        reception_date: &str,
        user_id: &str,
    ) -> Result<Order, PasstrackError> {
        let now = format_ts(Utc::now());

        sqlx::query(
            "INSERT INTO orders (uid, short_uid, user_id, reception_date, is_deleted, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(uid)
        .bind(short_uid)
        .bind(user_id)
        .bind(reception_date)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| PasstrackError::Store(format!("create order failed: {e}")))?;

        self.find_order(uid)
            .await?
            .ok_or_else(|| PasstrackError::Store(format!("order {uid} vanished after insert")))
    }

    pub async fn find_order(&self, uid: &str) -> Result<Option<Order>, PasstrackError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE uid = ?"))
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PasstrackError::Store(format!("find order failed: {e}")))?;

        row.map(|r| order_from_row(&r)).transpose()
    }

    /// Find an order that is still actively tracked under this UID.
    pub async fn find_active_order(&self, uid: &str) -> Result<Option<Order>, PasstrackError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE uid = ? AND is_deleted = 0"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PasstrackError::Store(format!("find active order failed: {e}")))?;

        row.map(|r| order_from_row(&r)).transpose()
    }

    /// All non-deleted orders, oldest first — the polling set.
    pub async fn active_orders(&self) -> Result<Vec<Order>, PasstrackError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE is_deleted = 0 ORDER BY created_at, uid"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PasstrackError::Store(format!("active orders failed: {e}")))?;

        rows.iter().map(order_from_row).collect()
    }

    /// Non-deleted orders of one user, oldest first.
    pub async fn active_orders_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Order>, PasstrackError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE user_id = ? AND is_deleted = 0 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PasstrackError::Store(format!("active orders for user failed: {e}")))?;

        rows.iter().map(order_from_row).collect()
    }

    /// Persist the mirrored status fields after an upstream refresh.
    /// Also refreshes `updated_at`, both in the row and on `order` itself.
    pub async fn save_status(&self, order: &mut Order) -> Result<(), PasstrackError> {
        order.updated_at = Utc::now();

        sqlx::query(
            "UPDATE orders SET \
                source_uid = ?, reception_date = ?, status_id = ?, status_name = ?, \
                status_description = ?, status_color = ?, status_subscription = ?, \
                status_internal_name = ?, status_percent = ?, is_deleted = ?, updated_at = ? \
             WHERE uid = ?",
        )
        .bind(&order.source_uid)
        .bind(&order.reception_date)
        .bind(order.status_id)
        .bind(&order.status_name)
        .bind(&order.status_description)
        .bind(&order.status_color)
        .bind(order.status_subscription)
        .bind(&order.status_internal_name)
        .bind(order.status_percent)
        .bind(order.is_deleted)
        .bind(format_ts(order.updated_at))
        .bind(&order.uid)
        .execute(&self.pool)
        .await
        .map_err(|e| PasstrackError::Store(format!("save status failed: {e}")))?;

        Ok(())
    }

    /// Soft-delete one order of one user. Returns the updated order, or
    /// `None` when no matching row exists.
    pub async fn soft_delete_order(
        &self,
        uid: &str,
        user_id: &str,
    ) -> Result<Option<Order>, PasstrackError> {
        let result = sqlx::query(
            "UPDATE orders SET is_deleted = 1, updated_at = ? WHERE uid = ? AND user_id = ?",
        )
        .bind(format_ts(Utc::now()))
        .bind(uid)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| PasstrackError::Store(format!("soft delete failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_order(uid).await
    }

    /// Soft-delete every active order of one user (blocked-user cascade).
    /// Returns the retired orders.
    pub async fn soft_delete_orders_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Order>, PasstrackError> {
        let active = self.active_orders_for_user(user_id).await?;
        if active.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query("UPDATE orders SET is_deleted = 1, updated_at = ? WHERE user_id = ? AND is_deleted = 0")
            .bind(format_ts(Utc::now()))
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PasstrackError::Store(format!("soft delete all failed: {e}")))?;

        let mut retired = Vec::with_capacity(active.len());
        for order in active {
            match self.find_order(&order.uid).await? {
                Some(updated) => retired.push(updated),
                None => retired.push(order),
            }
        }
        Ok(retired)
    }
}

fn order_from_row(row: &SqliteRow) -> Result<Order, PasstrackError> {
    let created_at: String = get(row, "created_at")?;
    let updated_at: String = get(row, "updated_at")?;

    Ok(Order {
        uid: get(row, "uid")?,
        short_uid: get(row, "short_uid")?,
        user_id: get(row, "user_id")?,
        source_uid: get(row, "source_uid")?,
        reception_date: get(row, "reception_date")?,
        status_id: get(row, "status_id")?,
        status_name: get(row, "status_name")?,
        status_description: get(row, "status_description")?,
        status_color: get(row, "status_color")?,
        status_subscription: get(row, "status_subscription")?,
        status_internal_name: get(row, "status_internal_name")?,
        status_percent: get(row, "status_percent")?,
        is_deleted: get(row, "is_deleted")?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, PasstrackError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| PasstrackError::Store(format!("bad column {column}: {e}")))
}
