// # Memory Host Store
//
// In-memory implementation of the host collaborators.
//
// ## Purpose
//
// Backs the daemon when no snapshot file is configured, and every test that
// needs an order book. Nothing survives a restart.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::HostData;
use crate::order::{OrderId, OrderSnapshot};
use crate::status::OrderStatus;
use crate::traits::{MetaStore, OrderRepository};
use crate::Error;

/// In-memory order book and metadata
///
/// # Example
///
/// ```rust,no_run
/// use navex_core::host::MemoryHostStore;
/// use navex_core::order::OrderSnapshot;
/// use navex_core::traits::OrderRepository;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryHostStore::new();
///     store.insert_order(OrderSnapshot::new(501)).await;
///
///     let order = store.get_order(&501.into()).await?;
///     assert!(order.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryHostStore {
    inner: Arc<RwLock<HostData>>,
}

impl MemoryHostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an order
    pub async fn insert_order(&self, order: OrderSnapshot) {
        self.inner.write().await.orders.insert(order.id.clone(), order);
    }

    /// History notes recorded for an order
    pub async fn notes(&self, id: &OrderId) -> Vec<String> {
        self.inner
            .read()
            .await
            .notes
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.orders.is_empty()
    }
}

#[async_trait]
impl OrderRepository for MemoryHostStore {
    async fn get_order(&self, id: &OrderId) -> Result<Option<OrderSnapshot>, Error> {
        Ok(self.inner.read().await.orders.get(id).cloned())
    }

    async fn list_by_status(&self, status: &OrderStatus) -> Result<Vec<OrderId>, Error> {
        Ok(self.inner.read().await.list_by_status(status))
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        note: &str,
    ) -> Result<(), Error> {
        self.inner.write().await.update_status(id, status, note)
    }
}

#[async_trait]
impl MetaStore for MemoryHostStore {
    async fn get_meta(&self, id: &OrderId, key: &str) -> Result<Option<String>, Error> {
        Ok(self.inner.read().await.get_meta(id, key))
    }

    async fn set_meta(&self, id: &OrderId, key: &str, value: &str) -> Result<(), Error> {
        self.inner.write().await.set_meta(id, key, value);
        Ok(())
    }
}
