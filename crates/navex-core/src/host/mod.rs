//! Host store implementations
//!
//! Both stores implement [`OrderRepository`](crate::traits::OrderRepository)
//! and [`MetaStore`](crate::traits::MetaStore) over the same data shape:
//!
//! - [`MemoryHostStore`]: in-process, lost on restart
//! - [`FileHostStore`]: JSON snapshot file with atomic writes and backup recovery

pub mod file;
pub mod memory;

pub use file::FileHostStore;
pub use memory::MemoryHostStore;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::order::{OrderId, OrderSnapshot};
use crate::status::OrderStatus;
use crate::Error;

/// Orders, their metadata and status-change notes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct HostData {
    #[serde(default)]
    pub orders: BTreeMap<OrderId, OrderSnapshot>,

    #[serde(default)]
    pub meta: HashMap<OrderId, BTreeMap<String, String>>,

    /// Order history notes, oldest first
    #[serde(default)]
    pub notes: HashMap<OrderId, Vec<String>>,
}

impl HostData {
    pub fn list_by_status(&self, status: &OrderStatus) -> Vec<OrderId> {
        self.orders
            .values()
            .filter(|order| &order.status == status)
            .map(|order| order.id.clone())
            .collect()
    }

    pub fn update_status(&mut self, id: &OrderId, status: OrderStatus, note: &str) -> Result<(), Error> {
        let order = self
            .orders
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("order {}", id)))?;
        tracing::debug!(order = %id, from = %order.status, to = %status, "Order status changed");
        order.status = status;
        if !note.is_empty() {
            self.notes.entry(id.clone()).or_default().push(note.to_string());
        }
        Ok(())
    }

    pub fn get_meta(&self, id: &OrderId, key: &str) -> Option<String> {
        self.meta.get(id).and_then(|fields| fields.get(key)).cloned()
    }

    pub fn set_meta(&mut self, id: &OrderId, key: &str, value: &str) {
        self.meta
            .entry(id.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
}
