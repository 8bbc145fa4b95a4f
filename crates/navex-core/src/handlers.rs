//! Host-exposed request handlers
//!
//! Transport-agnostic versions of the admin endpoints. Each handler checks
//! the request token, validates its input, calls the [`SyncEngine`] and
//! wraps the result in the host's JSON envelope. Error strings are shown to
//! shop staff as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::config::CarrierCredentials;
use crate::error::ErrorKind;
use crate::order::OrderId;
use crate::sync::{NO_TRACKING_CODE, ReconcileReport, SyncEngine};
use crate::traits::NonceVerifier;

/// Token action for the single-order endpoints
pub const TRACKING_NONCE_ACTION: &str = "navexwp_ajax_nonce";
/// Token action for the bulk ship endpoint
pub const BULK_NONCE_ACTION: &str = "wobu_nonce";

const INVALID_ORDER_ID: &str = "Invalid order ID";
const INVALID_TOKEN: &str = "Invalid security token";
const ORDER_NOT_FOUND: &str = "Order not found";
const NO_CODE_FOR_ORDER: &str = "No tracking code found for this order";
const NO_STATUS: &str = "Could not retrieve tracking status from API";
const NO_ORDERS_SELECTED: &str = "No orders selected.";

/// JSON envelope returned to the admin UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AjaxResponse {
    pub success: bool,
    pub data: Value,
}

impl AjaxResponse {
    pub fn success(data: Value) -> Self {
        Self { success: true, data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::String(message.into()),
        }
    }
}

/// Single-order request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingAction {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub nonce: String,
}

/// Bulk ship request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkShipAction {
    #[serde(default)]
    pub order_ids: Vec<String>,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub nonce: String,
}

/// Request a tracking code for one order
pub async fn get_tracking_code(
    engine: &SyncEngine,
    creds: &CarrierCredentials,
    nonces: &dyn NonceVerifier,
    action: TrackingAction,
) -> AjaxResponse {
    if !nonces.verify(&action.nonce, TRACKING_NONCE_ACTION) {
        return AjaxResponse::error(INVALID_TOKEN);
    }
    let Some(order_id) = OrderId::parse(&action.order_id) else {
        return AjaxResponse::error(INVALID_ORDER_ID);
    };

    match engine.request_code(creds, &order_id, "").await {
        Ok(outcome) => AjaxResponse::success(json!({
            "tracking_code": outcome.tracking_code,
            "status": outcome.status,
        })),
        Err(e) if e.kind() == ErrorKind::NotFound => AjaxResponse::error(ORDER_NOT_FOUND),
        Err(e) => {
            warn!(order = %order_id, "Tracking code request failed: {}", e);
            AjaxResponse::error(NO_TRACKING_CODE)
        }
    }
}

/// Refresh the carrier status of one order
pub async fn check_tracking_status(
    engine: &SyncEngine,
    creds: &CarrierCredentials,
    nonces: &dyn NonceVerifier,
    action: TrackingAction,
) -> AjaxResponse {
    if !nonces.verify(&action.nonce, TRACKING_NONCE_ACTION) {
        return AjaxResponse::error(INVALID_TOKEN);
    }
    let Some(order_id) = OrderId::parse(&action.order_id) else {
        return AjaxResponse::error(INVALID_ORDER_ID);
    };

    match engine.refresh_status(creds, &order_id).await {
        Ok(outcome) if !outcome.status.is_empty() => AjaxResponse::success(json!({
            "status": outcome.status,
            "updated": format_timestamp(outcome.updated_at),
        })),
        Ok(_) => AjaxResponse::error(NO_STATUS),
        Err(e) if e.kind() == ErrorKind::NotReady => AjaxResponse::error(NO_CODE_FOR_ORDER),
        Err(e) => {
            warn!(order = %order_id, "Status check failed: {}", e);
            AjaxResponse::error(NO_STATUS)
        }
    }
}

/// Ship the selected orders
///
/// Partial failure is still a successful response; the failing ids are
/// listed in `ErrorId`.
pub async fn bulk_ship(
    engine: &SyncEngine,
    creds: &CarrierCredentials,
    nonces: &dyn NonceVerifier,
    action: BulkShipAction,
) -> AjaxResponse {
    if !nonces.verify(&action.nonce, BULK_NONCE_ACTION) {
        return AjaxResponse::error(INVALID_TOKEN);
    }

    if action.order_ids.is_empty() {
        return AjaxResponse::error(NO_ORDERS_SELECTED);
    }

    // Ids that do not parse are still attempted, so they show up in `ErrorId`
    let ids: Vec<OrderId> = action
        .order_ids
        .iter()
        .map(|raw| OrderId::parse(raw).unwrap_or_else(|| OrderId::new(raw.as_str())))
        .collect();

    match engine.bulk_ship(creds, &ids, &action.designation).await {
        Ok(outcome) if outcome.all_succeeded() => AjaxResponse::success(json!({ "navex": "ok" })),
        Ok(outcome) => {
            let failed: Vec<&str> = outcome.failed_ids.iter().map(OrderId::as_str).collect();
            AjaxResponse::success(json!({
                "navex": "Some order not shipped with Navex",
                "ErrorId": failed.join(", "),
            }))
        }
        Err(e) => AjaxResponse::error(e.to_string()),
    }
}

/// Manual trigger for the periodic reconciliation pass
pub async fn run_reconciliation(engine: &SyncEngine, creds: &CarrierCredentials) -> AjaxResponse {
    match engine.reconcile_held_orders(creds).await {
        Ok(report) => AjaxResponse::success(report_json(&report)),
        Err(e) => AjaxResponse::error(e.to_string()),
    }
}

fn report_json(report: &ReconcileReport) -> Value {
    serde_json::to_value(report).unwrap_or(Value::Null)
}

fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}
