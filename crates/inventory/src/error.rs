use common::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with the stock ledger.
///
/// Business outcomes (insufficient stock, unknown product, missing
/// reservation) are not errors; they are reported through the outcome
/// types in [`crate::types`].
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Concurrent writers kept moving the entry's version and the
    /// optimistic loop gave up.
    #[error("Concurrency conflict on product {product_id}: gave up after {attempts} attempts")]
    ConcurrencyConflict { product_id: ProductId, attempts: u32 },

    /// A reservation must be for at least one unit.
    #[error("Invalid reservation quantity for product {product_id}: {quantity}")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Adding stock would push the available quantity past `u32::MAX`.
    #[error("Stock overflow for product {product_id}: cannot add {quantity} units")]
    StockOverflow { product_id: ProductId, quantity: u32 },

    /// The ledger could not be reached or refused to serve the call.
    #[error("Inventory unavailable: {0}")]
    Unavailable(String),

    /// Stored data violates a ledger invariant.
    #[error("Corrupt ledger data: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
