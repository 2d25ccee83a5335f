//! Shared fakes and fixtures for engine and scheduler tests.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use passtrack_core::error::FetchError;
use passtrack_core::order::{InternalStatus, PassportStatus, UpstreamStatus};
use passtrack_core::traits::{Notifier, SendOutcome, StatusMessageVariant, StatusSource};
use passtrack_core::user::User;
use passtrack_store::Store;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub async fn test_store() -> Store {
    Store::open_in_memory().await.unwrap()
}

/// A structurally valid UID with today's date embedded, unique per `n`.
pub fn fresh_uid(n: u32) -> String {
    let date = Utc::now().date_naive();
    format!(
        "200038101{:04}{:02}{:02}{:08}",
        date.year(),
        date.month(),
        date.day(),
        n
    )
}

pub fn status_dto(percent: i64, internal_name: &str) -> UpstreamStatus {
    UpstreamStatus {
        source_uid: Some("src".to_string()),
        reception_date: Some("2023-09-05".to_string()),
        passport_status: PassportStatus {
            passport_status_id: 1,
            name: "Оформление".to_string(),
            description: None,
            color: None,
            subscription: None,
        },
        internal_status: InternalStatus {
            name: internal_name.to_string(),
            percent,
        },
    }
}

/// Upstream fake that replays a fixed script of outcomes and records every
/// call with the endpoint it was issued against.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<UpstreamStatus, FetchError>>>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<UpstreamStatus, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn endpoints_used(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch(&self, endpoint: &str, uid: &str) -> Result<UpstreamStatus, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), uid.to_string()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(FetchError::NotFound))
    }
}

pub fn script_source(script: Vec<Result<UpstreamStatus, FetchError>>) -> Arc<ScriptedSource> {
    Arc::new(ScriptedSource::new(script))
}

/// Notifier fake recording every send; outcomes are replayed from a script
/// (empty script means every send is delivered).
pub struct RecordingNotifier {
    pub sends: Mutex<Vec<(String, StatusMessageVariant)>>,
    outcomes: Mutex<VecDeque<SendOutcome>>,
}

impl RecordingNotifier {
    pub fn new(outcomes: Vec<SendOutcome>) -> Self {
        Self {
            sends: Mutex::new(Vec::new()),
            outcomes: Mutex::new(outcomes.into()),
        }
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_status(
        &self,
        user: &User,
        _order: &passtrack_core::order::Order,
        variant: StatusMessageVariant,
    ) -> SendOutcome {
        self.sends.lock().unwrap().push((user.id.clone(), variant));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SendOutcome::Delivered)
    }

    async fn send_text(&self, user: &User, _text: &str) -> SendOutcome {
        self.sends
            .lock()
            .unwrap()
            .push((user.id.clone(), StatusMessageVariant::Current));
        SendOutcome::Delivered
    }
}
