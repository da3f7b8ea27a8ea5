//! Undo list for a partially completed order creation.

use common::{OrderNumber, ProductId};
use inventory::{ReleaseOutcome, StockLedger};

use crate::gateway::InventoryGateway;

/// A reservation to give back if the saga fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Release {
    product_id: ProductId,
    quantity: u32,
}

/// Outcome of running a [`Compensation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompensationReport {
    /// Products whose reservation was released, or was already gone.
    pub released: Vec<ProductId>,
    /// Products whose release call failed. Their stock stays held until
    /// reconciled.
    pub failed: Vec<ProductId>,
}

impl CompensationReport {
    /// Returns true if every recorded release went through.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Releases recorded while reserving stock for one order.
///
/// Each successful reserve records a release. On failure, [`run`](Self::run)
/// executes them newest first. A failed release is logged and counted,
/// never retried here, so compensation always terminates.
#[derive(Debug, Clone)]
pub struct Compensation {
    order_number: OrderNumber,
    releases: Vec<Release>,
}

impl Compensation {
    pub fn new(order_number: OrderNumber) -> Self {
        Self {
            order_number,
            releases: Vec::new(),
        }
    }

    /// Records that `quantity` units of `product_id` may be held for this order.
    pub fn record_release(&mut self, product_id: ProductId, quantity: u32) {
        self.releases.push(Release {
            product_id,
            quantity,
        });
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Runs every recorded release in reverse order.
    #[tracing::instrument(skip(self, gateway), fields(order_number = %self.order_number, steps = self.releases.len()))]
    pub async fn run<L: StockLedger>(self, gateway: &InventoryGateway<L>) -> CompensationReport {
        let mut report = CompensationReport::default();
        if self.releases.is_empty() {
            return report;
        }

        metrics::counter!("saga_compensations_total").increment(1);

        for release in self.releases.iter().rev() {
            match gateway
                .release(release.product_id, release.quantity, &self.order_number)
                .await
            {
                Ok(ReleaseOutcome::Released { quantity }) => {
                    tracing::debug!(product_id = %release.product_id, quantity, "reservation released");
                    report.released.push(release.product_id);
                }
                Ok(ReleaseOutcome::NotFound) => {
                    report.released.push(release.product_id);
                }
                Err(e) => {
                    metrics::counter!("reservation_reconciliation_gaps_total", "operation" => "release")
                        .increment(1);
                    tracing::warn!(
                        product_id = %release.product_id,
                        quantity = release.quantity,
                        error = %e,
                        "compensating release failed, reservation left for reconciliation"
                    );
                    report.failed.push(release.product_id);
                }
            }
        }

        report
    }
}
