//! Order domain types, the upstream status payload, and status predicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal status phrases marking a terminal outcome. An order showing one
/// of these at 0% is finished and leaves the polling set for good.
pub const TERMINAL_INTERNAL_STATUSES: [&str; 2] =
    ["паспорт выдан", "отмена изготовления паспорта"];

/// A tracked passport application, owned by one user.
///
/// The `status_*` fields mirror the latest upstream response verbatim and
/// are `None` until the first successful lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub uid: String,
    pub short_uid: String,
    pub user_id: String,
    pub source_uid: Option<String>,
    pub reception_date: Option<String>,
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
    pub status_description: Option<String>,
    pub status_color: Option<String>,
    pub status_subscription: Option<bool>,
    pub status_internal_name: Option<String>,
    pub status_percent: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A freshly subscribed order that has never seen an upstream response.
    pub fn is_new(&self) -> bool {
        self.status_percent.is_none()
    }

    /// Terminal outcome: 0% combined with one of the closing phrases.
    /// 0% alone is not enough — early in-progress statuses also report 0%.
    pub fn is_complete(&self) -> bool {
        self.status_percent == Some(0)
            && self
                .status_internal_name
                .as_deref()
                .is_some_and(|name| {
                    let name = name.to_lowercase();
                    TERMINAL_INTERNAL_STATUSES.iter().any(|s| *s == name)
                })
    }

    /// Capture the audited status fields as they are right now.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status_id: self.status_id,
            status_name: self.status_name.clone(),
            status_internal_name: self.status_internal_name.clone(),
            status_percent: self.status_percent,
        }
    }

    /// Overwrite the mirrored status fields from an upstream response.
    ///
    /// A successful fresh lookup also re-activates a soft-deleted order
    /// (observed production behavior, kept as-is).
    pub fn apply_status(&mut self, dto: &UpstreamStatus) {
        self.source_uid = dto.source_uid.clone();
        self.reception_date = dto.reception_date.clone();
        self.status_id = Some(dto.passport_status.passport_status_id);
        self.status_name = Some(dto.passport_status.name.clone());
        self.status_description = dto.passport_status.description.clone();
        self.status_color = dto.passport_status.color.clone();
        self.status_subscription = dto.passport_status.subscription;
        self.status_internal_name = Some(dto.internal_status.name.clone());
        self.status_percent = Some(dto.internal_status.percent);
        self.is_deleted = false;
    }
}

/// Field-level copy of exactly the audited status fields, taken before an
/// update so the audit log can record the transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
    pub status_internal_name: Option<String>,
    pub status_percent: Option<i64>,
}

/// True when the meaningful status fields differ between a pre-update
/// snapshot and the refreshed order. Description, color and subscription
/// changes are cosmetic and deliberately ignored.
pub fn has_changes(old: &StatusSnapshot, new: &Order) -> bool {
    old.status_percent != new.status_percent
        || old.status_name != new.status_name
        || old.status_internal_name != new.status_internal_name
}

/// One append-only audit record of an order transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAudit {
    pub id: String,
    pub order_uid: String,
    pub user_id: String,
    pub old: StatusSnapshot,
    pub new: StatusSnapshot,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

// --- Upstream API payload ---

/// Status payload returned by the upstream API for one UID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamStatus {
    #[serde(default)]
    pub source_uid: Option<String>,
    #[serde(default)]
    pub reception_date: Option<String>,
    pub passport_status: PassportStatus,
    pub internal_status: InternalStatus,
}

/// Public-facing status block of the upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportStatus {
    pub passport_status_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub subscription: Option<bool>,
}

/// Internal status block; `percent` is the primary completion signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalStatus {
    pub name: String,
    pub percent: i64,
}
