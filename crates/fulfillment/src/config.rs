//! Coordinator and gateway settings.

use std::time::Duration;

use domain::PricingPolicy;

/// Timeout and retry settings for calls through the inventory gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Upper bound on a single attempt.
    pub call_timeout: Duration,
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
}

impl GatewayConfig {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(2),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

/// Settings for the order coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub pricing: PricingPolicy,
    /// Days between order creation and the expected delivery date.
    pub delivery_lead_days: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            delivery_lead_days: 5,
        }
    }
}
