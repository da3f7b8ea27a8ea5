//! Client side of the stock ledger boundary.

use std::future::Future;

use common::{OrderNumber, ProductId};
use inventory::{
    ConfirmOutcome, LedgerError, ProductInfo, ReleaseOutcome, ReserveOutcome, StockLedger,
};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Reaches a [`StockLedger`] with a bounded timeout per attempt and a
/// bounded number of attempts per call.
///
/// Retrying is safe for every call: lookups are read-only, and reserve,
/// confirm and release are idempotent per `(product_id, order_number)`.
/// A call that fails every attempt comes back as
/// [`GatewayError::Unreachable`], never as a business outcome.
pub struct InventoryGateway<L> {
    ledger: L,
    config: GatewayConfig,
}

impl<L: StockLedger> InventoryGateway<L> {
    /// Creates a gateway with default timeouts.
    pub fn new(ledger: L) -> Self {
        Self::with_config(ledger, GatewayConfig::default())
    }

    /// Creates a gateway with custom timeouts.
    pub fn with_config(ledger: L, config: GatewayConfig) -> Self {
        Self { ledger, config }
    }

    /// Returns the wrapped ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Fetches current product data. `None` means the product does not exist.
    pub async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductInfo>, GatewayError> {
        self.call("get_product", product_id, || {
            self.ledger.get_product(product_id)
        })
        .await
    }

    pub async fn reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_number: &OrderNumber,
    ) -> Result<ReserveOutcome, GatewayError> {
        self.call("reserve", product_id, || {
            self.ledger
                .check_and_reserve(product_id, quantity, order_number)
        })
        .await
    }

    pub async fn confirm(
        &self,
        product_id: ProductId,
        order_number: &OrderNumber,
    ) -> Result<ConfirmOutcome, GatewayError> {
        self.call("confirm", product_id, || {
            self.ledger.confirm(product_id, order_number)
        })
        .await
    }

    pub async fn release(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_number: &OrderNumber,
    ) -> Result<ReleaseOutcome, GatewayError> {
        self.call("release", product_id, || {
            self.ledger.release(product_id, quantity, order_number)
        })
        .await
    }

    #[tracing::instrument(skip(self, attempt_call), fields(%product_id))]
    async fn call<T, F, Fut>(
        &self,
        operation: &'static str,
        product_id: ProductId,
        attempt_call: F,
    ) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = inventory::Result<T>>,
    {
        let attempts = self.config.max_attempts.max(1);
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.config.call_timeout, attempt_call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(LedgerError::ConcurrencyConflict {
                    product_id,
                    attempts,
                })) => {
                    return Err(GatewayError::Contended {
                        product_id,
                        attempts,
                    });
                }
                Ok(Err(e)) if is_transient(&e) => last_failure = e.to_string(),
                Ok(Err(e)) => {
                    return Err(GatewayError::Rejected {
                        operation,
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    last_failure = format!("timed out after {:?}", self.config.call_timeout);
                }
            }

            if attempt < attempts {
                metrics::counter!("inventory_gateway_retries_total", "operation" => operation)
                    .increment(1);
                tracing::debug!(attempt, error = %last_failure, "inventory call failed, retrying");
                tokio::time::sleep(self.config.backoff_after(attempt)).await;
            }
        }

        metrics::counter!("inventory_gateway_unreachable_total", "operation" => operation)
            .increment(1);
        tracing::warn!(attempts, error = %last_failure, "inventory unreachable");
        Err(GatewayError::Unreachable {
            operation,
            reason: last_failure,
        })
    }
}

/// Failures that say nothing about the request itself.
fn is_transient(error: &LedgerError) -> bool {
    matches!(
        error,
        LedgerError::Unavailable(_) | LedgerError::Database(_) | LedgerError::Migration(_)
    )
}
