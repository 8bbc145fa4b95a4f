// # Order Repository Trait
//
// The host's order persistence layer. The core reads orders and changes
// their status; it never creates or deletes them.

use async_trait::async_trait;

use crate::order::{OrderId, OrderSnapshot};
use crate::status::OrderStatus;

/// Trait for host order access
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Load an order
    ///
    /// # Returns
    ///
    /// - `Ok(Some(OrderSnapshot))`: The order
    /// - `Ok(None)`: No such order
    /// - `Err(Error)`: Storage error
    async fn get_order(&self, id: &OrderId) -> Result<Option<OrderSnapshot>, crate::Error>;

    /// Ids of every order currently in `status`
    async fn list_by_status(&self, status: &OrderStatus) -> Result<Vec<OrderId>, crate::Error>;

    /// Move an order to `status`, recording `note` in the order history
    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        note: &str,
    ) -> Result<(), crate::Error>;
}
