//! Order lines and the product snapshot they copy.

use common::{LineId, Money, ProductId};
use serde::{Deserialize, Serialize};

use super::{LineStatus, OrderError, PricingPolicy};

/// Product identity and price as seen when the order was placed.
///
/// Lines keep their own copy so historical orders never reflect later
/// catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
}

impl ProductSnapshot {
    pub fn new(
        product_id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            sku: sku.into(),
            name: name.into(),
            unit_price,
        }
    }
}

/// A line in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: LineId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    /// `unit_price * quantity`.
    pub total_price: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    /// `total_price - discount_amount + tax_amount`.
    pub final_price: Money,
    pub status: LineStatus,
}

impl OrderLine {
    /// Prices a new line from a product snapshot.
    pub fn new(
        product: ProductSnapshot,
        quantity: u32,
        pricing: &PricingPolicy,
    ) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: product.product_id,
                quantity,
            });
        }
        if !product.unit_price.is_positive() {
            return Err(OrderError::InvalidPrice {
                product_id: product.product_id,
                price: product.unit_price,
            });
        }

        let total_price = product.unit_price.multiply(quantity);
        let tax_amount = pricing.tax_on(total_price);
        let discount_amount = Money::zero();

        Ok(Self {
            id: LineId::new(),
            product_id: product.product_id,
            sku: product.sku,
            name: product.name,
            unit_price: product.unit_price,
            quantity,
            total_price,
            discount_amount,
            tax_amount,
            final_price: total_price - discount_amount + tax_amount,
            status: LineStatus::Pending,
        })
    }

    /// Checks the line's derived amounts against its inputs.
    pub fn verify(&self) -> Result<(), OrderError> {
        if self.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: self.product_id,
                quantity: self.quantity,
            });
        }
        if !self.unit_price.is_positive() {
            return Err(OrderError::InvalidPrice {
                product_id: self.product_id,
                price: self.unit_price,
            });
        }

        let total = self.unit_price.multiply(self.quantity);
        if total != self.total_price {
            return Err(OrderError::TotalsMismatch {
                field: "line total_price",
                stored: self.total_price,
                computed: total,
            });
        }
        let final_price = self.total_price - self.discount_amount + self.tax_amount;
        if final_price != self.final_price {
            return Err(OrderError::TotalsMismatch {
                field: "line final_price",
                stored: self.final_price,
                computed: final_price,
            });
        }
        Ok(())
    }
}
