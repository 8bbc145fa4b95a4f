//! Test doubles shared by the synchronization contract tests
//!
//! The scripted carrier answers from per-order and per-code tables and
//! counts every call, so tests can assert both outcomes and traffic.

#![allow(dead_code)]

use navex_core::error::{Error, Result};
use navex_core::traits::{Carrier, CarrierFactory, CarrierResponse};
use navex_core::{
    Address, CarrierCredentials, EngineConfig, MemoryHostStore, OrderSnapshot, OrderStatus,
    ShipmentRequest, SyncEngine, SyncEvent,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Replies shared by every carrier the factory hands out
#[derive(Default)]
pub struct CarrierScript {
    /// Shipment replies keyed by order id; `Err` is a transport failure
    shipments: Mutex<HashMap<String, std::result::Result<Value, String>>>,
    /// Status replies keyed by tracking code; `Err` is an API failure
    statuses: Mutex<HashMap<String, std::result::Result<Value, String>>>,
    requests: Mutex<Vec<ShipmentRequest>>,
    request_calls: AtomicUsize,
    status_calls: AtomicUsize,
    created: AtomicUsize,
}

impl CarrierScript {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_shipment(&self, order_id: &str, body: Value) {
        self.shipments
            .lock()
            .unwrap()
            .insert(order_id.to_string(), Ok(body));
    }

    pub fn fail_shipment(&self, order_id: &str, message: &str) {
        self.shipments
            .lock()
            .unwrap()
            .insert(order_id.to_string(), Err(message.to_string()));
    }

    pub fn on_status(&self, code: &str, body: Value) {
        self.statuses
            .lock()
            .unwrap()
            .insert(code.to_string(), Ok(body));
    }

    pub fn fail_status(&self, code: &str, message: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(code.to_string(), Err(message.to_string()));
    }

    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Shipment requests received, in call order
    pub fn requests(&self) -> Vec<ShipmentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Carrier answering from a [`CarrierScript`]
pub struct ScriptedCarrier {
    script: Arc<CarrierScript>,
    configured: bool,
}

#[async_trait::async_trait]
impl Carrier for ScriptedCarrier {
    async fn request_tracking_code(&self, request: &ShipmentRequest) -> Result<CarrierResponse> {
        if !self.configured {
            return Err(Error::not_configured("endpoint is empty"));
        }
        self.script.request_calls.fetch_add(1, Ordering::SeqCst);
        self.script.requests.lock().unwrap().push(request.clone());

        let reply = self
            .script
            .shipments
            .lock()
            .unwrap()
            .get(request.order_id.as_str())
            .cloned()
            .unwrap_or_else(|| Ok(Value::Object(Default::default())));
        reply.map(CarrierResponse::from).map_err(Error::transport)
    }

    async fn get_tracking_status(&self, tracking_code: &str) -> Result<CarrierResponse> {
        if !self.configured {
            return Err(Error::not_configured("endpoint is empty"));
        }
        self.script.status_calls.fetch_add(1, Ordering::SeqCst);

        let reply = self
            .script
            .statuses
            .lock()
            .unwrap()
            .get(tracking_code)
            .cloned()
            .unwrap_or_else(|| Ok(Value::Object(Default::default())));
        reply.map(CarrierResponse::from).map_err(Error::api)
    }

    fn carrier_name(&self) -> &'static str {
        "scripted"
    }
}

pub struct ScriptedCarrierFactory {
    script: Arc<CarrierScript>,
}

impl ScriptedCarrierFactory {
    pub fn new(script: &Arc<CarrierScript>) -> Self {
        Self {
            script: Arc::clone(script),
        }
    }
}

impl CarrierFactory for ScriptedCarrierFactory {
    fn create(&self, credentials: &CarrierCredentials) -> Result<Box<dyn Carrier>> {
        self.script.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedCarrier {
            script: Arc::clone(&self.script),
            configured: !credentials.endpoint.trim().is_empty(),
        }))
    }
}

pub fn creds() -> CarrierCredentials {
    CarrierCredentials::new("https://api.navex.test", "shop", "key").with_designation("Vetements")
}

pub fn engine(
    store: &MemoryHostStore,
    script: &Arc<CarrierScript>,
) -> (SyncEngine, mpsc::Receiver<SyncEvent>) {
    SyncEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(ScriptedCarrierFactory::new(script)),
        &EngineConfig::default(),
    )
    .expect("engine construction succeeds")
}

/// Order with a shipping name, two items and a billing phone
pub fn order(id: u64, status: OrderStatus) -> OrderSnapshot {
    OrderSnapshot::new(id)
        .with_status(status)
        .with_total("30")
        .with_shipping(Address {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            address_1: "12 Rue de Marseille".into(),
            city: "Tunis".into(),
            state: "Tunis".into(),
            phone: String::new(),
        })
        .with_billing(Address {
            city: "Tunis".into(),
            phone: "20123456".into(),
            ..Address::default()
        })
        .with_items(["Shirt", "Hat"])
}

/// Drain every event currently queued
pub fn drain(rx: &mut mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
