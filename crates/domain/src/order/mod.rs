//! Order aggregate and related types.

mod aggregate;
mod commands;
mod line;
mod pricing;
mod state;

pub use aggregate::{Order, OrderParts};
pub use commands::{OrderLineRequest, PlaceOrder};
pub use line::{OrderLine, ProductSnapshot};
pub use pricing::PricingPolicy;
pub use state::{LineStatus, OrderStatus, PaymentStatus, UnknownStatus};

use common::{Money, ProductId};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// A required customer field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Order has no lines.
    #[error("Order has no lines")]
    NoLines,

    /// Invalid quantity.
    #[error("Invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Invalid price.
    #[error("Invalid price for product {product_id}: {price} (must be greater than 0)")]
    InvalidPrice { product_id: ProductId, price: Money },

    /// The same product appears on more than one line.
    #[error("Product {product_id} appears on more than one line")]
    DuplicateProduct { product_id: ProductId },

    /// Discount below zero.
    #[error("Invalid discount: {discount} (must not be negative)")]
    NegativeDiscount { discount: Money },

    /// Shipping fee below zero.
    #[error("Invalid shipping fee: {fee} (must not be negative)")]
    NegativeShippingFee { fee: Money },

    /// The computed total is zero or negative.
    #[error("Order total must be greater than 0, got {total}")]
    NonPositiveTotal { total: Money },

    /// Stored totals disagree with the totals recomputed from the lines.
    #[error("Totals mismatch on {field}: stored {stored}, computed {computed}")]
    TotalsMismatch {
        field: &'static str,
        stored: Money,
        computed: Money,
    },

    /// Pricing can no longer change in this status.
    #[error("Order cannot be modified in {status} status")]
    NotModifiable { status: OrderStatus },

    /// The status machine has no edge between the two statuses.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
