//! Order placement request.

use std::collections::HashSet;

use common::{CustomerId, Money, ProductId};
use serde::{Deserialize, Serialize};

use super::OrderError;

/// One requested line: a product and how many units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLineRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Request to place a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub shipping_address: String,
    pub lines: Vec<OrderLineRequest>,
    #[serde(default)]
    pub discount: Money,
}

impl PlaceOrder {
    /// Creates a request with no lines and no discount.
    pub fn new(
        customer_id: CustomerId,
        customer_name: impl Into<String>,
        shipping_address: impl Into<String>,
    ) -> Self {
        Self {
            customer_id,
            customer_name: customer_name.into(),
            shipping_address: shipping_address.into(),
            lines: Vec::new(),
            discount: Money::zero(),
        }
    }

    /// Appends a line.
    pub fn with_line(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.lines.push(OrderLineRequest::new(product_id, quantity));
        self
    }

    /// Sets the order-level discount.
    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    /// Checks everything that can be checked without looking at inventory.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.customer_name.trim().is_empty() {
            return Err(OrderError::MissingField("customer_name"));
        }
        if self.shipping_address.trim().is_empty() {
            return Err(OrderError::MissingField("shipping_address"));
        }
        if self.lines.is_empty() {
            return Err(OrderError::NoLines);
        }
        if self.discount.is_negative() {
            return Err(OrderError::NegativeDiscount {
                discount: self.discount,
            });
        }

        let mut seen = HashSet::with_capacity(self.lines.len());
        for line in &self.lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }
            if !seen.insert(line.product_id) {
                return Err(OrderError::DuplicateProduct {
                    product_id: line.product_id,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PlaceOrder {
        PlaceOrder::new(CustomerId::new(), "Ada Lovelace", "12 St James's Square")
    }

    #[test]
    fn test_valid_request() {
        let req = request()
            .with_line(ProductId::new(1), 2)
            .with_line(ProductId::new(2), 1);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_lines_rejected() {
        assert_eq!(request().validate(), Err(OrderError::NoLines));
    }

    #[test]
    fn test_blank_customer_fields_rejected() {
        let req = PlaceOrder::new(CustomerId::new(), "  ", "Somewhere").with_line(ProductId::new(1), 1);
        assert_eq!(req.validate(), Err(OrderError::MissingField("customer_name")));

        let req = PlaceOrder::new(CustomerId::new(), "Ada", "").with_line(ProductId::new(1), 1);
        assert_eq!(
            req.validate(),
            Err(OrderError::MissingField("shipping_address"))
        );
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let req = request().with_line(ProductId::new(1), 0);
        assert!(matches!(
            req.validate(),
            Err(OrderError::InvalidQuantity { quantity: 0, .. })
        ));
    }

    #[test]
    fn test_duplicate_product_rejected() {
        let req = request()
            .with_line(ProductId::new(3), 1)
            .with_line(ProductId::new(3), 2);
        assert_eq!(
            req.validate(),
            Err(OrderError::DuplicateProduct {
                product_id: ProductId::new(3)
            })
        );
    }

    #[test]
    fn test_negative_discount_rejected() {
        let req = request()
            .with_line(ProductId::new(1), 1)
            .with_discount(Money::from_cents(-1));
        assert!(matches!(
            req.validate(),
            Err(OrderError::NegativeDiscount { .. })
        ));
    }

    #[test]
    fn test_discount_defaults_to_zero_when_absent() {
        let json = serde_json::json!({
            "customer_id": CustomerId::new(),
            "customer_name": "Ada",
            "shipping_address": "London",
            "lines": [{"product_id": 1, "quantity": 2}]
        });
        let req: PlaceOrder = serde_json::from_value(json).unwrap();
        assert!(req.discount.is_zero());
        assert_eq!(req.lines[0].product_id, ProductId::new(1));
    }
}
