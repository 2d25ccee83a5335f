use super::AutoupdateService;
use crate::orders::OrderService;
use crate::testutil::{
    fresh_uid, script_source, status_dto, test_store, RecordingNotifier, ScriptedSource,
};
use passtrack_core::config::AutoupdateConfig;
use passtrack_core::error::FetchError;
use passtrack_core::order::{Order, UpstreamStatus};
use passtrack_core::traits::{SendOutcome, StatusMessageVariant};
use passtrack_core::uid::parse_short_uid_from_uid;
use passtrack_core::user::User;
use passtrack_midpass::ProxyRotator;
use passtrack_store::Store;
use std::sync::atomic::Ordering;
use std::sync::Arc;

struct Harness {
    store: Store,
    source: Arc<ScriptedSource>,
    notifier: Arc<RecordingNotifier>,
    service: AutoupdateService,
}

async fn harness(
    script: Vec<Result<UpstreamStatus, FetchError>>,
    send_outcomes: Vec<SendOutcome>,
    endpoints: &[&str],
) -> Harness {
    let store = test_store().await;
    let source = script_source(script);
    let notifier = Arc::new(RecordingNotifier::new(send_outcomes));
    let endpoints: Vec<String> = endpoints.iter().map(|s| s.to_string()).collect();

    let rotator = ProxyRotator::new(endpoints.clone()).unwrap();
    let orders = Arc::new(OrderService::new(
        store.clone(),
        source.clone(),
        rotator,
        2,
    ));

    let config = AutoupdateConfig {
        schedules: vec!["23 9,12,15,18,21 * * 1-5".to_string()],
        timezone: "Europe/Moscow".to_string(),
        order_delay_ms: 0,
    };

    let service = AutoupdateService::new(
        store.clone(),
        orders,
        notifier.clone(),
        &config,
        endpoints,
    )
    .unwrap();

    Harness {
        store,
        source,
        notifier,
        service,
    }
}

async fn seed_user(store: &Store, id: &str) -> User {
    let user = User::new(id, "Анна", "", "anna");
    store.upsert_user(&user).await.unwrap();
    user
}

async fn seed_order(
    store: &Store,
    n: u32,
    user_id: &str,
    status: Option<(i64, &str)>,
) -> Order {
    let uid = fresh_uid(n);
    let mut order = store
        .create_order(&uid, &parse_short_uid_from_uid(&uid), "2023-09-05", user_id)
        .await
        .unwrap();
    if let Some((percent, internal)) = status {
        order.apply_status(&status_dto(percent, internal));
        store.save_status(&mut order).await.unwrap();
    }
    order
}

const IN_PROGRESS: &str = "документы в обработке";

#[tokio::test]
async fn test_circuit_breaker_aborts_run_and_still_summarizes() {
    let h = harness(
        vec![
            Ok(status_dto(50, IN_PROGRESS)),
            Ok(status_dto(50, IN_PROGRESS)),
            Err(FetchError::Timeout),
        ],
        vec![],
        &["https://a.example"],
    )
    .await;

    seed_user(&h.store, "111").await;
    for n in 1..=4 {
        seed_order(&h.store, n, "111", Some((50, IN_PROGRESS))).await;
    }

    let counter = h.service.run_once().await;

    // The 3rd lookup timed out: exactly two orders were fully processed
    // and the 4th was never attempted.
    assert_eq!(counter.orders_all, 4);
    assert_eq!(counter.orders_checked, 2);
    assert_eq!(counter.orders_updated, 0);
    assert_eq!(counter.orders_error, 1);
    assert_eq!(counter.orders_error_not_found, 0);
    assert_eq!(h.source.call_count(), 3);
    assert_eq!(h.notifier.send_count(), 0);

    // The summary still covers the truncated run.
    assert!(counter.summary().contains("2 checked"));
    assert_eq!(counter.route("https://a.example").ok, 2);
    assert_eq!(counter.route("https://a.example").err, 1);
}

#[tokio::test]
async fn test_completed_orders_skipped_without_network() {
    let h = harness(
        vec![Ok(status_dto(50, IN_PROGRESS))],
        vec![],
        &["https://a.example"],
    )
    .await;

    seed_user(&h.store, "111").await;
    let done = seed_order(&h.store, 1, "111", Some((0, "паспорт выдан"))).await;
    let active = seed_order(&h.store, 2, "111", Some((50, IN_PROGRESS))).await;

    let counter = h.service.run_once().await;

    assert_eq!(counter.orders_all, 2);
    assert_eq!(counter.orders_checked, 1);
    assert_eq!(h.source.call_count(), 1);

    let calls = h.source.calls.lock().unwrap();
    assert_eq!(calls[0].1, active.uid);
    assert!(calls.iter().all(|(_, uid)| uid != &done.uid));
}

#[tokio::test]
async fn test_change_notifies_owner_and_audits_transition() {
    let h = harness(
        vec![Ok(status_dto(75, "выдача"))],
        vec![],
        &["https://a.example"],
    )
    .await;

    seed_user(&h.store, "111").await;
    let order = seed_order(&h.store, 1, "111", Some((50, IN_PROGRESS))).await;

    let counter = h.service.run_once().await;

    assert_eq!(counter.orders_checked, 1);
    assert_eq!(counter.orders_updated, 1);
    assert_eq!(counter.users_checked, 1);

    // Owner got exactly one "changed" card.
    let sends = h.notifier.sends.lock().unwrap();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].0, "111");
    assert_eq!(sends[0].1, StatusMessageVariant::Changed);

    // Status persisted and the transition audited.
    let reloaded = h.store.find_order(&order.uid).await.unwrap().unwrap();
    assert_eq!(reloaded.status_percent, Some(75));

    let audits = h.store.audits_for_order(&order.uid).await.unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].old.status_percent, Some(50));
    assert_eq!(audits[0].new.status_percent, Some(75));
}

#[tokio::test]
async fn test_unchanged_order_not_notified() {
    let h = harness(
        vec![Ok(status_dto(50, IN_PROGRESS))],
        vec![],
        &["https://a.example"],
    )
    .await;

    seed_user(&h.store, "111").await;
    seed_order(&h.store, 1, "111", Some((50, IN_PROGRESS))).await;

    let counter = h.service.run_once().await;

    assert_eq!(counter.orders_checked, 1);
    assert_eq!(counter.orders_updated, 0);
    assert_eq!(h.notifier.send_count(), 0);
}

#[tokio::test]
async fn test_not_found_is_counted_and_run_continues() {
    let h = harness(
        vec![
            Err(FetchError::NotFound),
            Ok(status_dto(50, IN_PROGRESS)),
        ],
        vec![],
        &["https://a.example"],
    )
    .await;

    seed_user(&h.store, "111").await;
    seed_order(&h.store, 1, "111", Some((50, IN_PROGRESS))).await;
    seed_order(&h.store, 2, "111", Some((50, IN_PROGRESS))).await;

    let counter = h.service.run_once().await;

    assert_eq!(counter.orders_checked, 2);
    assert_eq!(counter.orders_error, 1);
    assert_eq!(counter.orders_error_not_found, 1);
    assert_eq!(h.source.call_count(), 2);
    assert_eq!(counter.route("https://a.example").ok, 1);
    assert_eq!(counter.route("https://a.example").err, 1);
}

#[tokio::test]
async fn test_blocked_user_cascade_and_suppression() {
    let h = harness(
        vec![
            Ok(status_dto(75, "выдача")),
            Ok(status_dto(75, "выдача")),
        ],
        vec![SendOutcome::Blocked],
        &["https://a.example"],
    )
    .await;

    seed_user(&h.store, "111").await;
    let first = seed_order(&h.store, 1, "111", Some((50, IN_PROGRESS))).await;
    seed_order(&h.store, 2, "111", Some((50, IN_PROGRESS))).await;

    let counter = h.service.run_once().await;

    // Both orders changed, but only the first send was attempted; the
    // second was suppressed after the block.
    assert_eq!(counter.orders_updated, 2);
    assert_eq!(h.notifier.send_count(), 1);

    // The cascade retired the user's orders and flagged the user. (The
    // second order was re-activated by its own subsequent refresh — the
    // preserved production behavior; the next run's block repeats the
    // cascade.)
    let first = h.store.find_order(&first.uid).await.unwrap().unwrap();
    assert!(first.is_deleted);
    assert!(h.store.find_user("111").await.unwrap().unwrap().is_blocked);
}

#[tokio::test]
async fn test_round_robin_attribution_across_orders() {
    let h = harness(
        vec![
            Ok(status_dto(50, IN_PROGRESS)),
            Ok(status_dto(50, IN_PROGRESS)),
            Ok(status_dto(50, IN_PROGRESS)),
        ],
        vec![],
        &["https://a.example", "https://b.example"],
    )
    .await;

    seed_user(&h.store, "111").await;
    seed_user(&h.store, "222").await;
    seed_order(&h.store, 1, "111", Some((50, IN_PROGRESS))).await;
    seed_order(&h.store, 2, "222", Some((50, IN_PROGRESS))).await;
    seed_order(&h.store, 3, "111", Some((50, IN_PROGRESS))).await;

    let counter = h.service.run_once().await;

    assert_eq!(
        h.source.endpoints_used(),
        vec!["https://a.example", "https://b.example", "https://a.example"]
    );
    assert_eq!(counter.route("https://a.example").ok, 2);
    assert_eq!(counter.route("https://b.example").ok, 1);
    assert_eq!(counter.users_checked, 2);
}

#[tokio::test]
async fn test_trigger_skipped_while_run_in_progress() {
    let h = harness(vec![], vec![], &["https://a.example"]).await;

    seed_user(&h.store, "111").await;
    seed_order(&h.store, 1, "111", Some((50, IN_PROGRESS))).await;

    h.service.running.store(true, Ordering::SeqCst);
    h.service.trigger().await;
    assert_eq!(h.source.call_count(), 0);

    h.service.running.store(false, Ordering::SeqCst);
    h.service.trigger().await;
    assert_eq!(h.source.call_count(), 1);
}
