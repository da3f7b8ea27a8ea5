//! Domain layer for order fulfillment.
//!
//! This crate provides the order aggregate:
//! - `Order` with its lines, derived totals and status state machine
//! - `PlaceOrder` request validation
//! - `PricingPolicy` for tax and shipping
//!
//! Nothing here performs I/O. Reserving stock and persisting orders are
//! the job of the `fulfillment` and `order-store` crates.

pub mod order;

pub use order::{
    LineStatus, Order, OrderError, OrderLine, OrderLineRequest, OrderParts, OrderStatus,
    PaymentStatus, PlaceOrder, PricingPolicy, ProductSnapshot, UnknownStatus,
};
