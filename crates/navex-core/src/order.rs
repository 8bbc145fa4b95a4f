//! Host order snapshot
//!
//! The core only reads orders; these types mirror the fields the host
//! exposes through [`crate::traits::OrderRepository`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::status::OrderStatus;

/// Host order identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse an id received from a request: must be a positive integer
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => None,
            Ok(n) => Some(Self(n.to_string())),
        }
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u64> for OrderId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Postal address block as stored by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    pub city: String,
    pub state: String,
    pub phone: String,
}

/// One order line item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Display name of the product
    pub name: String,
}

impl OrderItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Read-only view of a host order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: OrderId,

    #[serde(default)]
    pub status: OrderStatus,

    /// Order total as the host stores it (a decimal string)
    #[serde(default)]
    pub total: String,

    #[serde(default)]
    pub shipping: Address,

    #[serde(default)]
    pub billing: Address,

    #[serde(default)]
    pub items: Vec<OrderItem>,

    #[serde(default)]
    pub customer_note: String,
}

impl OrderSnapshot {
    /// Create an empty order in `pending` status
    pub fn new(id: impl Into<OrderId>) -> Self {
        Self {
            id: id.into(),
            status: OrderStatus::default(),
            total: String::new(),
            shipping: Address::default(),
            billing: Address::default(),
            items: Vec::new(),
            customer_note: String::new(),
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_total(mut self, total: impl Into<String>) -> Self {
        self.total = total.into();
        self
    }

    pub fn with_shipping(mut self, shipping: Address) -> Self {
        self.shipping = shipping;
        self
    }

    pub fn with_billing(mut self, billing: Address) -> Self {
        self.billing = billing;
        self
    }

    pub fn with_items<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = names.into_iter().map(OrderItem::new).collect();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.customer_note = note.into();
        self
    }

    /// Shipping first and last name joined by a space
    pub fn formatted_shipping_name(&self) -> String {
        format!("{} {}", self.shipping.first_name, self.shipping.last_name)
            .trim()
            .to_string()
    }
}
