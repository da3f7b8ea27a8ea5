//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, OrderNumber, Version};
use serde::{Deserialize, Serialize};

use super::{
    LineStatus, OrderError, OrderLine, OrderStatus, PaymentStatus, PlaceOrder, PricingPolicy,
};

/// Order aggregate root.
///
/// Pure data and state machine: it validates its own monetary invariants
/// and knows nothing about inventory or storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    customer_id: CustomerId,
    customer_name: String,
    shipping_address: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    lines: Vec<OrderLine>,
    subtotal: Money,
    tax_amount: Money,
    shipping_amount: Money,
    discount_amount: Money,
    total_amount: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expected_delivery_date: Option<DateTime<Utc>>,
    actual_delivery_date: Option<DateTime<Utc>>,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,
}

/// Every stored field of an order, used to rebuild one from storage.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub shipping_address: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub version: Version,
}

// Construction
impl Order {
    /// Builds a new `Pending` order from priced lines.
    ///
    /// Order tax is computed on the subtotal and is authoritative; the
    /// per-line tax amounts are informational.
    pub fn place(
        order_number: OrderNumber,
        request: &PlaceOrder,
        lines: Vec<OrderLine>,
        pricing: &PricingPolicy,
        placed_at: DateTime<Utc>,
        expected_delivery_date: Option<DateTime<Utc>>,
    ) -> Result<Self, OrderError> {
        request.validate()?;
        pricing.validate()?;
        if lines.is_empty() {
            return Err(OrderError::NoLines);
        }
        for line in &lines {
            line.verify()?;
        }

        let mut order = Self {
            id: OrderId::new(),
            order_number,
            customer_id: request.customer_id,
            customer_name: request.customer_name.trim().to_string(),
            shipping_address: request.shipping_address.trim().to_string(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            lines,
            subtotal: Money::zero(),
            tax_amount: Money::zero(),
            shipping_amount: pricing.shipping_fee,
            discount_amount: request.discount,
            total_amount: Money::zero(),
            created_at: placed_at,
            updated_at: placed_at,
            expected_delivery_date,
            actual_delivery_date: None,
            version: Version::initial(),
        };
        order.recompute_totals(pricing)?;
        Ok(order)
    }

    /// Rebuilds an order from stored parts, re-checking its totals.
    pub fn from_parts(parts: OrderParts) -> Result<Self, OrderError> {
        let order = Self {
            id: parts.id,
            order_number: parts.order_number,
            customer_id: parts.customer_id,
            customer_name: parts.customer_name,
            shipping_address: parts.shipping_address,
            status: parts.status,
            payment_status: parts.payment_status,
            lines: parts.lines,
            subtotal: parts.subtotal,
            tax_amount: parts.tax_amount,
            shipping_amount: parts.shipping_amount,
            discount_amount: parts.discount_amount,
            total_amount: parts.total_amount,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            expected_delivery_date: parts.expected_delivery_date,
            actual_delivery_date: parts.actual_delivery_date,
            version: parts.version,
        };
        order.verify_totals()?;
        Ok(order)
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// Returns the lines in the order they were requested.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax_amount(&self) -> Money {
        self.tax_amount
    }

    pub fn shipping_amount(&self) -> Money {
        self.shipping_amount
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn expected_delivery_date(&self) -> Option<DateTime<Utc>> {
        self.expected_delivery_date
    }

    pub fn actual_delivery_date(&self) -> Option<DateTime<Utc>> {
        self.actual_delivery_date
    }

    /// Returns the version last written to storage.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Mutations
impl Order {
    /// Records the version the order was stored at.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Moves the order to `to`, returning the status it left.
    ///
    /// Lines follow the order, `Delivered` stamps the delivery date and
    /// marks payment as paid, `Refunded` marks payment as refunded.
    pub fn transition_to(
        &mut self,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<OrderStatus, OrderError> {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { from, to });
        }

        self.status = to;
        self.updated_at = at;
        if let Some(line_status) = LineStatus::following(to) {
            for line in &mut self.lines {
                line.status = line_status;
            }
        }
        match to {
            OrderStatus::Delivered => {
                self.actual_delivery_date = Some(at);
                self.payment_status = PaymentStatus::Paid;
            }
            OrderStatus::Refunded => self.payment_status = PaymentStatus::Refunded,
            _ => {}
        }
        Ok(from)
    }

    /// Replaces the order-level discount and recomputes the total.
    ///
    /// Only allowed while every line still holds its reservation.
    pub fn apply_discount(
        &mut self,
        discount: Money,
        pricing: &PricingPolicy,
        at: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if !self.status.holds_reservations() {
            return Err(OrderError::NotModifiable {
                status: self.status,
            });
        }
        if discount.is_negative() {
            return Err(OrderError::NegativeDiscount { discount });
        }

        let previous = self.discount_amount;
        self.discount_amount = discount;
        if let Err(e) = self.recompute_totals(pricing) {
            self.discount_amount = previous;
            self.recompute_totals(pricing)?;
            return Err(e);
        }
        self.updated_at = at;
        Ok(())
    }

    fn recompute_totals(&mut self, pricing: &PricingPolicy) -> Result<(), OrderError> {
        let subtotal: Money = self.lines.iter().map(|line| line.total_price).sum();
        let tax_amount = pricing.tax_on(subtotal);
        let total = subtotal + tax_amount + self.shipping_amount - self.discount_amount;
        if !total.is_positive() {
            return Err(OrderError::NonPositiveTotal { total });
        }

        self.subtotal = subtotal;
        self.tax_amount = tax_amount;
        self.total_amount = total;
        Ok(())
    }

    /// Checks the stored totals against the lines.
    ///
    /// Subtotal and total must match exactly. The order's tax may differ
    /// from the sum of line taxes by at most one cent per line, the
    /// rounding each line can contribute.
    pub fn verify_totals(&self) -> Result<(), OrderError> {
        if self.lines.is_empty() {
            return Err(OrderError::NoLines);
        }
        for line in &self.lines {
            line.verify()?;
        }
        for amount in [
            self.tax_amount,
            self.shipping_amount,
            self.discount_amount,
        ] {
            if amount.is_negative() {
                return Err(OrderError::TotalsMismatch {
                    field: "non-negative amount",
                    stored: amount,
                    computed: Money::zero(),
                });
            }
        }

        let subtotal: Money = self.lines.iter().map(|line| line.total_price).sum();
        if subtotal != self.subtotal {
            return Err(OrderError::TotalsMismatch {
                field: "subtotal",
                stored: self.subtotal,
                computed: subtotal,
            });
        }

        let line_tax: Money = self.lines.iter().map(|line| line.tax_amount).sum();
        let tolerance = Money::from_cents(self.lines.len() as i64);
        if line_tax.abs_diff(self.tax_amount) > tolerance {
            return Err(OrderError::TotalsMismatch {
                field: "tax_amount",
                stored: self.tax_amount,
                computed: line_tax,
            });
        }

        let total = self.subtotal + self.tax_amount + self.shipping_amount - self.discount_amount;
        if total != self.total_amount {
            return Err(OrderError::TotalsMismatch {
                field: "total_amount",
                stored: self.total_amount,
                computed: total,
            });
        }
        if !total.is_positive() {
            return Err(OrderError::NonPositiveTotal { total });
        }
        Ok(())
    }
}
