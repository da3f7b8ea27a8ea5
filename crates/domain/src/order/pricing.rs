//! Pricing policy: tax rate and flat shipping fee.

use common::Money;
use serde::{Deserialize, Serialize};

use super::OrderError;

/// Tax and shipping constants applied when an order is priced.
///
/// The tax rate is expressed in basis points (1000 = 10%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub tax_rate_bps: u32,
    pub shipping_fee: Money,
}

impl PricingPolicy {
    pub fn new(tax_rate_bps: u32, shipping_fee: Money) -> Self {
        Self {
            tax_rate_bps,
            shipping_fee,
        }
    }

    /// Rejects a negative shipping fee.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.shipping_fee.is_negative() {
            return Err(OrderError::NegativeShippingFee {
                fee: self.shipping_fee,
            });
        }
        Ok(())
    }

    /// Tax owed on `amount`, rounded half away from zero to the cent.
    pub fn tax_on(&self, amount: Money) -> Money {
        amount.percent_bps(self.tax_rate_bps)
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate_bps: 1000,
            shipping_fee: Money::from_dollars(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ten_percent_and_ten_dollars() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.tax_on(Money::from_dollars(250)), Money::from_dollars(25));
        assert_eq!(policy.shipping_fee, Money::from_cents(1000));
    }

    #[test]
    fn test_tax_rounds_half_up() {
        let policy = PricingPolicy::new(1000, Money::zero());
        assert_eq!(policy.tax_on(Money::from_cents(5)), Money::from_cents(1));
        assert_eq!(policy.tax_on(Money::from_cents(4)), Money::from_cents(0));
        assert_eq!(policy.tax_on(Money::from_cents(1_995)), Money::from_cents(200));
    }

    #[test]
    fn test_negative_shipping_fee_is_invalid() {
        assert!(PricingPolicy::default().validate().is_ok());
        assert!(PricingPolicy::new(1000, Money::zero()).validate().is_ok());
        assert!(matches!(
            PricingPolicy::new(1000, Money::from_cents(-500)).validate(),
            Err(OrderError::NegativeShippingFee { .. })
        ));
    }

    #[test]
    fn test_zero_rate() {
        let policy = PricingPolicy::new(0, Money::zero());
        assert!(policy.tax_on(Money::from_dollars(99)).is_zero());
    }
}
