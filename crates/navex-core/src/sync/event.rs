//! Sync events and operation outcomes

use serde::Serialize;

use crate::order::OrderId;
use crate::status::OrderStatus;

/// Events emitted by the [`SyncEngine`](super::SyncEngine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A tracking code was stored on an order
    CodeAssigned {
        order_id: OrderId,
        tracking_code: String,
    },

    /// Carrier status fetched and stored
    StatusRefreshed { order_id: OrderId, status: String },

    /// Host order status changed
    OrderTransitioned {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// A shipment within a bulk or automatic request failed
    ShipmentFailed { order_id: OrderId, error: String },

    /// A reconciliation pass finished
    ReconcileFinished { report: ReconcileReport },
}

/// Result of a successful single-order code request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeOutcome {
    pub tracking_code: String,
    pub status: String,
}

/// Result of a status refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusOutcome {
    pub status: String,
    /// Unix seconds
    pub updated_at: i64,
}

/// Result of a bulk shipment
///
/// `succeeded + failed_ids.len()` equals the number of distinct ids submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failed_ids: Vec<OrderId>,
}

impl BulkOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed_ids.is_empty()
    }
}

/// Counters for one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Held orders examined
    pub checked: usize,
    /// Held orders without a tracking code
    pub skipped: usize,
    pub refreshed: usize,
    pub completed: usize,
    pub failed: usize,
}
