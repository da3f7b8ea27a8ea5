//! Fulfillment error types.

use common::{OrderId, ProductId};
use domain::{OrderError, OrderStatus};
use order_store::StoreError;
use thiserror::Error;

/// Failures of a call through the inventory gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure or timeout on every attempt. The call may or may
    /// not have been applied by the ledger.
    #[error("Inventory unreachable during {operation}: {reason}")]
    Unreachable {
        operation: &'static str,
        reason: String,
    },

    /// The ledger's optimistic loop kept losing to concurrent writers.
    #[error("Stock for product {product_id} contended: gave up after {attempts} attempts")]
    Contended { product_id: ProductId, attempts: u32 },

    /// The ledger answered but refused the call.
    #[error("Inventory rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
}

/// Errors surfaced by the order coordinator.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Malformed order input.
    #[error("Validation error: {0}")]
    Validation(OrderError),

    /// A requested product does not exist in inventory.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// A product lacks enough available stock.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Inventory could not be reached or stayed contended. Nothing was left
    /// reserved, so the whole call may be retried.
    #[error("Inventory unavailable during {operation}: {reason}")]
    InventoryUnavailable {
        operation: &'static str,
        reason: String,
    },

    /// Inventory refused a call for a reason retrying will not fix.
    #[error("Inventory rejected {operation}: {reason}")]
    InventoryRejected {
        operation: &'static str,
        reason: String,
    },

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The status machine has no edge between the two statuses.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The order's status forbids the operation outright.
    #[error("Order {order_id} cannot be cancelled in {status} status")]
    IllegalState {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// Order store error.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    /// Returns true if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            FulfillmentError::InventoryUnavailable { .. } => true,
            FulfillmentError::Store(e) => e.is_conflict(),
            _ => false,
        }
    }

    /// Short, stable name of the error kind, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentError::Validation(_) => "validation",
            FulfillmentError::ProductNotFound { .. } => "product_not_found",
            FulfillmentError::InsufficientStock { .. } => "insufficient_stock",
            FulfillmentError::InventoryUnavailable { .. } => "inventory_unavailable",
            FulfillmentError::InventoryRejected { .. } => "inventory_rejected",
            FulfillmentError::OrderNotFound(_) => "order_not_found",
            FulfillmentError::InvalidTransition { .. } => "invalid_transition",
            FulfillmentError::IllegalState { .. } => "illegal_state",
            FulfillmentError::Store(_) => "store",
        }
    }
}

impl From<OrderError> for FulfillmentError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidTransition { from, to } => {
                FulfillmentError::InvalidTransition { from, to }
            }
            other => FulfillmentError::Validation(other),
        }
    }
}

impl From<GatewayError> for FulfillmentError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unreachable { operation, reason } => {
                FulfillmentError::InventoryUnavailable { operation, reason }
            }
            GatewayError::Contended {
                product_id,
                attempts,
            } => FulfillmentError::InventoryUnavailable {
                operation: "reserve",
                reason: format!("stock for product {product_id} contended after {attempts} attempts"),
            },
            GatewayError::Rejected { operation, reason } => {
                FulfillmentError::InventoryRejected { operation, reason }
            }
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
