//! Stock ledger data model and call outcomes.

use chrono::{DateTime, Utc};
use common::{Money, OrderNumber, ProductId, Version};
use serde::{Deserialize, Serialize};

/// Stock record for a single product, owned by the inventory side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit_price: Money,
    /// Units free to reserve. Never negative; decrements that would
    /// underflow are rejected.
    pub available_quantity: u32,
    pub reorder_level: u32,
    /// Bumped on every change to `available_quantity`.
    pub version: Version,
}

impl StockEntry {
    /// Creates a new entry at the initial version.
    pub fn new(
        product_id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        available_quantity: u32,
    ) -> Self {
        Self {
            product_id,
            sku: sku.into(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            unit_price,
            available_quantity,
            reorder_level: 0,
            version: Version::initial(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_reorder_level(mut self, reorder_level: u32) -> Self {
        self.reorder_level = reorder_level;
        self
    }

    /// Returns true when stock has fallen to or below the reorder level.
    pub fn needs_reorder(&self) -> bool {
        self.available_quantity <= self.reorder_level
    }
}

/// Product data exposed across the service boundary (`GetProduct`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit_price: Money,
    pub available_quantity: u32,
}

impl From<&StockEntry> for ProductInfo {
    fn from(entry: &StockEntry) -> Self {
        Self {
            product_id: entry.product_id,
            sku: entry.sku.clone(),
            name: entry.name.clone(),
            description: entry.description.clone(),
            category: entry.category.clone(),
            unit_price: entry.unit_price,
            available_quantity: entry.available_quantity,
        }
    }
}

/// Identity of a reservation: one per product per order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationKey {
    pub product_id: ProductId,
    pub order_number: OrderNumber,
}

impl ReservationKey {
    pub fn new(product_id: ProductId, order_number: &OrderNumber) -> Self {
        Self {
            product_id,
            order_number: order_number.clone(),
        }
    }
}

/// Quantity carved out of available stock for an order, not yet
/// permanently consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub product_id: ProductId,
    pub order_number: OrderNumber,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn key(&self) -> ReservationKey {
        ReservationKey::new(self.product_id, &self.order_number)
    }
}

/// Outcome of `check_and_reserve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Stock is held for the order. `quantity` is the amount on record,
    /// which for a repeated call is the amount of the first one.
    Reserved { quantity: u32 },
    InsufficientStock { requested: u32, available: u32 },
    ProductNotFound,
}

/// Outcome of `confirm`. `NotFound` is an idempotent success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed { quantity: u32 },
    NotFound,
}

/// Outcome of `release`. `NotFound` is an idempotent success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released { quantity: u32 },
    NotFound,
}

/// Bound on the optimistic read-decide-write loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveRetry {
    pub max_attempts: u32,
}

impl Default for ReserveRetry {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

impl ReserveRetry {
    /// Attempts to make, never fewer than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_retry_makes_at_least_one_attempt() {
        assert_eq!(ReserveRetry::default().attempts(), 5);
        assert_eq!(ReserveRetry { max_attempts: 0 }.attempts(), 1);
    }

    #[test]
    fn test_needs_reorder_at_or_below_level() {
        let entry = StockEntry::new(ProductId::new(1), "SKU-1", "Widget", Money::from_cents(100), 5)
            .with_reorder_level(5);
        assert!(entry.needs_reorder());

        let entry = StockEntry {
            available_quantity: 6,
            ..entry
        };
        assert!(!entry.needs_reorder());
    }

    #[test]
    fn test_product_info_snapshot() {
        let entry = StockEntry::new(ProductId::new(7), "SKU-7", "Gadget", Money::from_cents(2500), 3)
            .with_category("tools")
            .with_description("A gadget");
        let info = ProductInfo::from(&entry);

        assert_eq!(info.product_id, ProductId::new(7));
        assert_eq!(info.sku, "SKU-7");
        assert_eq!(info.category, "tools");
        assert_eq!(info.unit_price.cents(), 2500);
        assert_eq!(info.available_quantity, 3);
    }

    #[test]
    fn test_entry_serialization() {
        let entry = StockEntry::new(ProductId::new(1), "SKU-1", "Widget", Money::from_cents(100), 5);
        let json = serde_json::to_string(&entry).unwrap();
        let back: StockEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
