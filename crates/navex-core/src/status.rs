//! Order-status state machine
//!
//! Two vocabularies meet here: the host's order states and the free-text
//! status labels returned by the carrier. The only carrier-driven transition
//! is `on-hold → completed`, taken when the label is a delivered value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Carrier labels meaning the parcel reached the customer (case-sensitive)
pub const DELIVERED_STATUSES: &[&str] = &["Livrer", "Livrer Paye"];

/// Host order state
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    /// Optional gate before shipment
    AwaitingAdmin,
    /// Handed to the carrier, awaiting delivery confirmation
    OnHold,
    /// Terminal: carrier confirmed delivery
    Completed,
    Cancelled,
    /// Any other host state, passed through untouched
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::AwaitingAdmin => "awaiting-admin",
            Self::OnHold => "on-hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Other(s) => s,
        }
    }

    /// The status orders are moved to once shipped
    pub fn held() -> Self {
        Self::OnHold
    }

    pub fn is_held(&self) -> bool {
        matches!(self, Self::OnHold)
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self {
        // Hosts sometimes prefix their states ("wc-on-hold").
        let value = value.trim();
        let value = value.strip_prefix("wc-").unwrap_or(value);
        match value {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "awaiting-admin" => Self::AwaitingAdmin,
            "on-hold" => Self::OnHold,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status label reported by the carrier (`etat`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierStatus<'a>(pub &'a str);

impl CarrierStatus<'_> {
    /// Case-sensitive match against [`DELIVERED_STATUSES`]
    pub fn is_delivered(&self) -> bool {
        DELIVERED_STATUSES.contains(&self.0)
    }
}

/// A host status change decided by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub to: OrderStatus,
    pub note: &'static str,
}

/// Shipment succeeded for an order in `current` state
///
/// `force` is set by the bulk path, which holds every shipped order;
/// single-order shipment only releases the awaiting-admin gate.
pub fn after_shipment(current: &OrderStatus, force: bool) -> Option<Transition> {
    if current.is_held() {
        return None;
    }
    if force || matches!(current, OrderStatus::AwaitingAdmin) {
        Some(Transition {
            to: OrderStatus::OnHold,
            note: "Status updated programmatically.",
        })
    } else {
        None
    }
}

/// Carrier reported `label` for an order in `current` state
pub fn after_refresh(current: &OrderStatus, label: &str) -> Option<Transition> {
    if current.is_held() && CarrierStatus(label).is_delivered() {
        Some(Transition {
            to: OrderStatus::Completed,
            note: "Order automatically marked as completed.",
        })
    } else {
        None
    }
}

/// Awaiting-admin gate: processing orders not validated yet are parked
pub fn admin_gate(current: &OrderStatus, already_validated: bool) -> Option<Transition> {
    if !already_validated && matches!(current, OrderStatus::Processing) {
        Some(Transition {
            to: OrderStatus::AwaitingAdmin,
            note: "Awaiting admin validation.",
        })
    } else {
        None
    }
}
