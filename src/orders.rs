//! Order service — subscription bookkeeping and the status update engine.
//!
//! The engine owns the full refresh of one order: snapshot, upstream
//! lookup through the rotator, field overwrite, persist, audit. Expected
//! failures travel as [`UpdateFailure`] tagged with the endpoint used so
//! the autoupdate run can attribute them in counters.

use passtrack_core::error::{PasstrackError, UpdateFailure};
use passtrack_core::order::{Order, StatusSnapshot};
use passtrack_core::traits::StatusSource;
use passtrack_core::uid;
use passtrack_core::user::User;
use passtrack_midpass::ProxyRotator;
use passtrack_store::Store;
use std::sync::Arc;
use tracing::warn;

/// A completed refresh: the pre-update snapshot for change detection and
/// the endpoint that served the lookup.
#[derive(Debug)]
pub struct UpdateSuccess {
    pub old: StatusSnapshot,
    pub endpoint: String,
}

pub struct OrderService {
    store: Store,
    source: Arc<dyn StatusSource>,
    rotator: ProxyRotator,
    max_orders_per_user: usize,
}

impl OrderService {
    pub fn new(
        store: Store,
        source: Arc<dyn StatusSource>,
        rotator: ProxyRotator,
        max_orders_per_user: usize,
    ) -> Self {
        Self {
            store,
            source,
            rotator,
            max_orders_per_user,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Subscribe a user to a UID. Idempotent for an order the user already
    /// tracks; rejects foreign active UIDs and per-user limit overruns.
    pub async fn create(&self, raw_uid: &str, user: &User) -> Result<Order, PasstrackError> {
        if !uid::is_valid_uid(raw_uid) {
            return Err(PasstrackError::Validation(format!(
                "not a valid application number: {raw_uid}"
            )));
        }

        if let Some(existing) = self.store.find_active_order(raw_uid).await? {
            if existing.user_id != user.id {
                return Err(PasstrackError::Validation(format!(
                    "order {} is tracked by another user",
                    existing.short_uid
                )));
            }
            return Ok(existing);
        }

        let active = self.store.active_orders_for_user(&user.id).await?;
        if active.len() >= self.max_orders_per_user {
            return Err(PasstrackError::Validation(format!(
                "user {} already tracks {} orders",
                user.id,
                active.len()
            )));
        }

        let order = self
            .store
            .create_order(
                raw_uid,
                &uid::parse_short_uid_from_uid(raw_uid),
                &uid::parse_reception_date_from_uid(raw_uid),
                &user.id,
            )
            .await?;

        self.audit_logged(&order, &user.id, None).await;

        Ok(order)
    }

    /// Refresh one order from the upstream. Mutates `order` in place on
    /// success; leaves it untouched on failure.
    ///
    /// A timeout is returned as-is for the caller to treat as a systemic
    /// signal. An audit write failure never rolls back the committed
    /// status write.
    pub async fn update(
        &self,
        order: &mut Order,
        user_id: &str,
    ) -> Result<UpdateSuccess, UpdateFailure> {
        let old = order.snapshot();
        let endpoint = self.rotator.next_endpoint();

        let dto = match self.source.fetch(&endpoint, &order.uid).await {
            Ok(dto) => dto,
            Err(e) => return Err(UpdateFailure::from_fetch(e, endpoint)),
        };

        order.apply_status(&dto);
        self.store
            .save_status(order)
            .await
            .map_err(|e| UpdateFailure::storage(e, endpoint.clone()))?;

        self.audit_logged(order, user_id, Some(&old)).await;

        Ok(UpdateSuccess { old, endpoint })
    }

    /// Unsubscribe one order of one user (soft delete + audit).
    pub async fn delete(&self, raw_uid: &str, user: &User) -> Result<Order, PasstrackError> {
        let Some(order) = self.store.soft_delete_order(raw_uid, &user.id).await? else {
            return Err(PasstrackError::NotFound(format!(
                "order {raw_uid} is not tracked by user {}",
                user.id
            )));
        };

        self.audit_logged(&order, &user.id, None).await;

        Ok(order)
    }

    /// Retire every active order of a user (blocked-user cascade).
    pub async fn delete_all(&self, user: &User) -> Result<Vec<Order>, PasstrackError> {
        let retired = self.store.soft_delete_orders_for_user(&user.id).await?;
        for order in &retired {
            self.audit_logged(order, &user.id, None).await;
        }
        Ok(retired)
    }

    async fn audit_logged(&self, order: &Order, user_id: &str, old: Option<&StatusSnapshot>) {
        if let Err(e) = self.store.create_audit(order, user_id, old).await {
            warn!("order {}: audit write failed: {e}", order.uid);
        }
    }
}
