use async_trait::async_trait;
use common::{OrderNumber, ProductId};

use crate::types::{
    ConfirmOutcome, ProductInfo, ReleaseOutcome, Reservation, ReserveOutcome, StockEntry,
};
use crate::Result;

/// Core trait for stock ledger implementations.
///
/// Each call is independently atomic for one product. No cross-product
/// atomicity is offered; callers stitch multi-product workflows together
/// with compensation.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Returns catalog and stock data for a product, or `None` if unknown.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<ProductInfo>>;

    /// Atomically reserves `quantity` units for `order_number`.
    ///
    /// If a reservation for the same key already exists the call succeeds
    /// without touching stock again. Fails with
    /// [`LedgerError::ConcurrencyConflict`](crate::LedgerError::ConcurrencyConflict)
    /// when concurrent writers exhaust the retry budget.
    async fn check_and_reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_number: &OrderNumber,
    ) -> Result<ReserveOutcome>;

    /// Converts a reservation into a permanent decrement by deleting it.
    async fn confirm(
        &self,
        product_id: ProductId,
        order_number: &OrderNumber,
    ) -> Result<ConfirmOutcome>;

    /// Deletes a reservation and returns its quantity to available stock.
    async fn release(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_number: &OrderNumber,
    ) -> Result<ReleaseOutcome>;

    /// Lists outstanding reservations held for an order.
    async fn reservations_for_order(&self, order_number: &OrderNumber)
    -> Result<Vec<Reservation>>;

    /// Inserts or replaces a product's catalog data and stock level.
    async fn upsert_product(&self, entry: StockEntry) -> Result<()>;

    /// Adds units to available stock. Returns the new level, or `None` if
    /// the product is unknown.
    async fn restock(&self, product_id: ProductId, quantity: u32) -> Result<Option<u32>>;

    /// Lists entries at or below their reorder level.
    async fn low_stock(&self) -> Result<Vec<StockEntry>>;
}
