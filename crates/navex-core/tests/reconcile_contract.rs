//! Contract Test: Reconciliation of held orders
//!
//! Constraints verified:
//! - Delivered carrier statuses complete held orders, others leave them held
//! - Missing credentials make the pass a silent no-op
//! - Per-order failures never stop the pass

mod common;

use common::*;
use navex_core::tracking::META_TRACKING_CODE;
use navex_core::traits::{MetaStore, OrderRepository};
use navex_core::{CarrierCredentials, MemoryHostStore, OrderId, OrderStatus, ReconcileReport};
use serde_json::json;

async fn held_with_code(store: &MemoryHostStore, id: u64, code: &str) {
    store.insert_order(order(id, OrderStatus::OnHold)).await;
    store
        .set_meta(&OrderId::from(id), META_TRACKING_CODE, code)
        .await
        .unwrap();
}

#[tokio::test]
async fn delivered_orders_are_completed() {
    let store = MemoryHostStore::new();
    held_with_code(&store, 1, "A").await;
    held_with_code(&store, 2, "B").await;
    held_with_code(&store, 3, "C").await;

    let script = CarrierScript::new();
    script.on_status("A", json!({ "etat": "Livrer" }));
    script.on_status("B", json!({ "etat": "En cours" }));
    script.on_status("C", json!({ "etat": "Livrer Paye" }));

    let (engine, _events) = engine(&store, &script);
    let report = engine.reconcile_held_orders(&creds()).await.unwrap();

    assert_eq!(
        report,
        ReconcileReport {
            checked: 3,
            skipped: 0,
            refreshed: 3,
            completed: 2,
            failed: 0,
        }
    );

    let status = |id: u64| {
        let store = store.clone();
        async move { store.get_order(&OrderId::from(id)).await.unwrap().unwrap().status }
    };
    assert_eq!(status(1).await, OrderStatus::Completed);
    assert_eq!(status(2).await, OrderStatus::OnHold);
    assert_eq!(status(3).await, OrderStatus::Completed);
    assert_eq!(
        store.notes(&OrderId::from(1)).await,
        vec!["Order automatically marked as completed.".to_string()]
    );
}

#[tokio::test]
async fn delivered_match_is_case_sensitive() {
    let store = MemoryHostStore::new();
    held_with_code(&store, 1, "A").await;

    let script = CarrierScript::new();
    script.on_status("A", json!({ "etat": "livrer" }));

    let (engine, _events) = engine(&store, &script);
    let report = engine.reconcile_held_orders(&creds()).await.unwrap();

    assert_eq!(report.completed, 0);
    let order = store.get_order(&OrderId::from(1)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::OnHold);
}

#[tokio::test]
async fn incomplete_credentials_are_a_no_op() {
    let store = MemoryHostStore::new();
    held_with_code(&store, 1, "A").await;
    let script = CarrierScript::new();
    script.on_status("A", json!({ "etat": "Livrer" }));

    let (engine, _events) = engine(&store, &script);
    for creds in [
        CarrierCredentials::new("", "shop", "key"),
        CarrierCredentials::new("https://api.navex.test", "", "key"),
        CarrierCredentials::new("https://api.navex.test", "shop", ""),
    ] {
        let report = tokio_test::assert_ok!(engine.reconcile_held_orders(&creds).await);
        assert_eq!(report, ReconcileReport::default());
    }

    assert_eq!(script.created(), 0);
    assert_eq!(script.status_calls(), 0);
    let order = store.get_order(&OrderId::from(1)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::OnHold);
}

#[tokio::test]
async fn orders_without_code_are_skipped() {
    let store = MemoryHostStore::new();
    store.insert_order(order(1, OrderStatus::OnHold)).await;
    held_with_code(&store, 2, "B").await;

    let script = CarrierScript::new();
    script.on_status("B", json!({ "etat": "Livrer" }));

    let (engine, _events) = engine(&store, &script);
    let report = engine.reconcile_held_orders(&creds()).await.unwrap();

    assert_eq!(report.checked, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(script.status_calls(), 1);
}

#[tokio::test]
async fn failures_do_not_stop_the_sweep() {
    let store = MemoryHostStore::new();
    held_with_code(&store, 1, "A").await;
    held_with_code(&store, 2, "B").await;
    held_with_code(&store, 3, "C").await;

    let script = CarrierScript::new();
    script.fail_status("A", "carrier down");
    // "B" answers with an empty body
    script.on_status("C", json!({ "etat": "Livrer" }));

    let (engine, _events) = engine(&store, &script);
    let report = engine.reconcile_held_orders(&creds()).await.unwrap();

    assert_eq!(report.failed, 2);
    assert_eq!(report.completed, 1);
    let order = store.get_order(&OrderId::from(3)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn only_held_orders_are_examined() {
    let store = MemoryHostStore::new();
    store.insert_order(order(1, OrderStatus::Processing)).await;
    store
        .set_meta(&OrderId::from(1), META_TRACKING_CODE, "A")
        .await
        .unwrap();

    let script = CarrierScript::new();
    script.on_status("A", json!({ "etat": "Livrer" }));

    let (engine, _events) = engine(&store, &script);
    let report = engine.reconcile_held_orders(&creds()).await.unwrap();

    assert_eq!(report.checked, 0);
    let order = store.get_order(&OrderId::from(1)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Processing);
}

#[tokio::test]
async fn dropped_event_receiver_does_not_fail_the_pass() {
    let store = MemoryHostStore::new();
    held_with_code(&store, 1, "A").await;
    let script = CarrierScript::new();
    script.on_status("A", json!({ "etat": "Livrer" }));

    let (engine, events) = engine(&store, &script);
    drop(events);

    let report = tokio_test::assert_ok!(engine.reconcile_held_orders(&creds()).await);
    assert_eq!(report.completed, 1);
}
