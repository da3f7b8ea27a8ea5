use async_trait::async_trait;
use common::{OrderId, OrderNumber, Version};
use domain::Order;

use crate::{OrderQuery, Result};

/// Storage for order aggregates.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Saves an order.
    ///
    /// `order.version()` is the version the caller loaded: `Version::initial()`
    /// inserts a new order, anything else updates the stored copy only if it
    /// is still at that version, failing with `ConcurrencyConflict`
    /// otherwise.
    ///
    /// Returns the version now stored.
    async fn save(&self, order: &Order) -> Result<Version>;

    /// Retrieves an order by ID.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Retrieves an order by its order number.
    async fn get_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>>;

    /// Lists orders matching a query.
    async fn list(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Deletes an order and its lines. Returns false if it did not exist.
    async fn delete(&self, order_id: OrderId) -> Result<bool>;
}
