//! Contract Test: Single-order tracking code request and status refresh
//!
//! Constraints verified:
//! - A returned code is stored with its link and followed by a status fetch
//! - Nothing is written when the carrier returns no code
//! - A refresh after a successful request never reports "not ready"
//! - Only the awaiting-admin gate is released by a single-order request

mod common;

use common::*;
use navex_core::tracking::{META_TRACKING_CODE, META_TRACKING_STATUS};
use navex_core::traits::{MetaStore, OrderRepository};
use navex_core::{CarrierCredentials, ErrorKind, MemoryHostStore, OrderId, OrderStatus, SyncEvent};
use serde_json::json;

#[tokio::test]
async fn request_code_stores_code_link_and_status() {
    let store = MemoryHostStore::new();
    store.insert_order(order(501, OrderStatus::Processing)).await;

    let script = CarrierScript::new();
    script.on_shipment("501", json!({ "tracking_code": "TRK1", "lien": "http://t/TRK1" }));
    script.on_status("TRK1", json!({ "etat": "En cours" }));

    let (engine, mut events) = engine(&store, &script);
    let outcome = engine
        .request_code(&creds(), &OrderId::from(501), "")
        .await
        .expect("code request succeeds");

    assert_eq!(outcome.tracking_code, "TRK1");
    assert_eq!(outcome.status, "En cours");

    let record = engine.tracking_record(&OrderId::from(501)).await.unwrap();
    assert_eq!(record.tracking_code, "TRK1");
    assert_eq!(record.tracking_link, "http://t/TRK1");
    assert_eq!(record.status, "En cours");
    assert!(record.updated_at.is_some());

    // Payload built from the order
    let requests = script.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].nom, "Jane Doe");
    assert_eq!(requests[0].article, ",Shirt,,Hat");
    assert_eq!(requests[0].designation, "");

    // Processing orders are not moved by a single-order request
    let order = store.get_order(&OrderId::from(501)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Processing);

    let events = drain(&mut events);
    assert!(events.contains(&SyncEvent::CodeAssigned {
        order_id: OrderId::from(501),
        tracking_code: "TRK1".into(),
    }));
}

#[tokio::test]
async fn missing_code_is_an_error_and_writes_nothing() {
    let store = MemoryHostStore::new();
    store.insert_order(order(7, OrderStatus::Processing)).await;

    let script = CarrierScript::new();
    script.on_shipment("7", json!({ "lien": "http://t/none" }));

    let (engine, _events) = engine(&store, &script);
    let err = engine
        .request_code(&creds(), &OrderId::from(7), "")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.to_string(), "Could not retrieve tracking code from API");
    assert_eq!(store.get_meta(&OrderId::from(7), META_TRACKING_CODE).await.unwrap(), None);
    assert_eq!(script.status_calls(), 0);
}

#[tokio::test]
async fn transport_failure_writes_nothing() {
    let store = MemoryHostStore::new();
    store.insert_order(order(8, OrderStatus::Processing)).await;

    let script = CarrierScript::new();
    script.fail_shipment("8", "connection reset");

    let (engine, _events) = engine(&store, &script);
    let err = engine
        .request_code(&creds(), &OrderId::from(8), "")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!engine.tracking_record(&OrderId::from(8)).await.unwrap().has_code());
}

#[tokio::test]
async fn status_failure_after_code_is_not_returned() {
    let store = MemoryHostStore::new();
    store.insert_order(order(9, OrderStatus::Processing)).await;

    let script = CarrierScript::new();
    script.on_shipment("9", json!({ "tracking_code": "TRK9", "lien": "http://t/TRK9" }));
    script.fail_status("TRK9", "carrier down");

    let (engine, _events) = engine(&store, &script);
    let outcome = engine
        .request_code(&creds(), &OrderId::from(9), "")
        .await
        .expect("code is stored even if the status fetch fails");

    assert_eq!(outcome.tracking_code, "TRK9");
    assert_eq!(outcome.status, "");
    assert_eq!(
        store.get_meta(&OrderId::from(9), META_TRACKING_STATUS).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn awaiting_admin_order_is_put_on_hold() {
    let store = MemoryHostStore::new();
    store.insert_order(order(11, OrderStatus::AwaitingAdmin)).await;

    let script = CarrierScript::new();
    script.on_shipment("11", json!({ "tracking_code": "TRK11" }));
    script.on_status("TRK11", json!({ "etat": "En attente" }));

    let (engine, _events) = engine(&store, &script);
    engine
        .request_code(&creds(), &OrderId::from(11), "")
        .await
        .unwrap();

    let order = store.get_order(&OrderId::from(11)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::OnHold);
    assert_eq!(
        store.notes(&OrderId::from(11)).await,
        vec!["Status updated programmatically.".to_string()]
    );
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let store = MemoryHostStore::new();
    let script = CarrierScript::new();
    let (engine, _events) = engine(&store, &script);

    let err = engine
        .request_code(&creds(), &OrderId::from(404), "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(script.request_calls(), 0);
}

#[tokio::test]
async fn refresh_without_code_is_not_ready() {
    let store = MemoryHostStore::new();
    store.insert_order(order(12, OrderStatus::OnHold)).await;
    let script = CarrierScript::new();
    let (engine, _events) = engine(&store, &script);

    let err = engine
        .refresh_status(&creds(), &OrderId::from(12))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotReady);
    assert_eq!(script.status_calls(), 0);
}

#[tokio::test]
async fn refresh_after_successful_request_is_never_not_ready() {
    let store = MemoryHostStore::new();
    let script = CarrierScript::new();
    for id in 20..25u64 {
        store.insert_order(order(id, OrderStatus::Processing)).await;
        let code = format!("TRK{}", id);
        script.on_shipment(&id.to_string(), json!({ "tracking_code": code }));
        script.on_status(&code, json!({ "etat": "En cours" }));
    }

    let (engine, _events) = engine(&store, &script);
    for id in 20..25u64 {
        let id = OrderId::from(id);
        engine.request_code(&creds(), &id, "").await.unwrap();
        tokio_test::assert_ok!(engine.refresh_status(&creds(), &id).await);
    }
}

#[tokio::test]
async fn empty_status_response_is_an_error_without_writes() {
    let store = MemoryHostStore::new();
    store.insert_order(order(30, OrderStatus::OnHold)).await;
    store
        .set_meta(&OrderId::from(30), META_TRACKING_CODE, "TRK30")
        .await
        .unwrap();

    let script = CarrierScript::new();
    let (engine, _events) = engine(&store, &script);

    let err = engine
        .refresh_status(&creds(), &OrderId::from(30))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(
        engine.tracking_record(&OrderId::from(30)).await.unwrap().updated_at,
        None
    );
}

#[tokio::test]
async fn missing_etat_stores_empty_status() {
    let store = MemoryHostStore::new();
    store.insert_order(order(31, OrderStatus::OnHold)).await;
    store
        .set_meta(&OrderId::from(31), META_TRACKING_CODE, "TRK31")
        .await
        .unwrap();

    let script = CarrierScript::new();
    script.on_status("TRK31", json!({ "details": { "hub": "Sfax" } }));
    let (engine, _events) = engine(&store, &script);

    let outcome = engine
        .refresh_status(&creds(), &OrderId::from(31))
        .await
        .unwrap();
    assert_eq!(outcome.status, "");

    let record = engine.tracking_record(&OrderId::from(31)).await.unwrap();
    assert_eq!(record.status_details, Some(json!({ "hub": "Sfax" })));
    assert_eq!(record.updated_at, Some(outcome.updated_at));
}

#[tokio::test]
async fn unconfigured_endpoint_fails_before_any_call() {
    let store = MemoryHostStore::new();
    store.insert_order(order(40, OrderStatus::Processing)).await;
    let script = CarrierScript::new();
    let (engine, _events) = engine(&store, &script);

    let creds = CarrierCredentials::new("", "shop", "key");
    let err = engine
        .request_code(&creds, &OrderId::from(40), "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConfigured);
    assert_eq!(script.request_calls(), 0);
}
