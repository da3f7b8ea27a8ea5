//! Application configuration loaded from environment variables.

use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use common::Money;
use domain::PricingPolicy;
use fulfillment::{CoordinatorConfig, GatewayConfig};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory backends when unset
/// - `TAX_RATE_BPS`: tax rate in basis points (default: `1000`)
/// - `SHIPPING_FEE_CENTS`: flat shipping fee, not negative (default: `1000`)
/// - `INVENTORY_TIMEOUT_MS`: per-attempt inventory call timeout (default: `2000`)
/// - `INVENTORY_MAX_ATTEMPTS`: attempts per inventory call (default: `3`)
/// - `DELIVERY_LEAD_DAYS`: days until expected delivery, at most 3650 (default: `5`)
///
/// Unparseable or out-of-range values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub tax_rate_bps: u32,
    pub shipping_fee_cents: i64,
    pub inventory_timeout_ms: u64,
    pub inventory_max_attempts: u32,
    pub delivery_lead_days: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(lookup("PORT"), defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            tax_rate_bps: parse_or(lookup("TAX_RATE_BPS"), defaults.tax_rate_bps),
            shipping_fee_cents: parse_within(
                lookup("SHIPPING_FEE_CENTS"),
                0..=i64::MAX,
                defaults.shipping_fee_cents,
            ),
            inventory_timeout_ms: parse_or(
                lookup("INVENTORY_TIMEOUT_MS"),
                defaults.inventory_timeout_ms,
            ),
            inventory_max_attempts: parse_or(
                lookup("INVENTORY_MAX_ATTEMPTS"),
                defaults.inventory_max_attempts,
            ),
            delivery_lead_days: parse_within(
                lookup("DELIVERY_LEAD_DAYS"),
                0..=MAX_DELIVERY_LEAD_DAYS,
                defaults.delivery_lead_days,
            ),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pricing(&self) -> PricingPolicy {
        PricingPolicy::new(self.tax_rate_bps, Money::from_cents(self.shipping_fee_cents))
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            call_timeout: Duration::from_millis(self.inventory_timeout_ms),
            max_attempts: self.inventory_max_attempts,
            ..GatewayConfig::default()
        }
    }

    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            pricing: self.pricing(),
            delivery_lead_days: self.delivery_lead_days,
        }
    }
}

/// Ten years.
const MAX_DELIVERY_LEAD_DAYS: u32 = 3650;

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_within<T: FromStr + PartialOrd>(
    raw: Option<String>,
    range: RangeInclusive<T>,
    default: T,
) -> T {
    raw.and_then(|v| v.trim().parse().ok())
        .filter(|v| range.contains(v))
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            tax_rate_bps: 1000,
            shipping_fee_cents: 1000,
            inventory_timeout_ms: 2000,
            inventory_max_attempts: 3,
            delivery_lead_days: 5,
        }
    }
}
