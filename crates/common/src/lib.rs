//! Shared identifiers and value types for the order-fulfillment workspace.

mod money;
mod order_number;
mod types;
mod version;

pub use money::Money;
pub use order_number::{OrderNumber, OrderNumberError};
pub use types::{CustomerId, LineId, OrderId, ProductId};
pub use version::Version;
