//! Stock ledger: the authoritative owner of per-product available quantity.
//!
//! Every mutation of stock goes through a [`StockLedger`]. Reservations are
//! keyed by `(product_id, order_number)`, which makes reserve, confirm and
//! release idempotent per key:
//!
//! ```text
//! check_and_reserve ──► Reservation ──┬──► confirm  (stock stays decremented)
//!                                     └──► release  (quantity returned)
//! ```
//!
//! Writers never take a global lock on stock. A reserve reads the entry,
//! decides, then commits only if the entry's [`Version`](common::Version)
//! is unchanged, retrying a bounded number of times on conflict.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod types;

pub use error::{LedgerError, Result};
pub use ledger::StockLedger;
pub use memory::InMemoryStockLedger;
pub use postgres::PostgresStockLedger;
pub use types::{
    ConfirmOutcome, ProductInfo, ReleaseOutcome, Reservation, ReservationKey, ReserveOutcome,
    ReserveRetry, StockEntry,
};
