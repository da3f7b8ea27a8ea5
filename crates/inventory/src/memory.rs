use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderNumber, ProductId, Version};
use tokio::sync::RwLock;

use crate::types::{
    ConfirmOutcome, ProductInfo, ReleaseOutcome, Reservation, ReservationKey, ReserveOutcome,
    ReserveRetry, StockEntry,
};
use crate::{LedgerError, Result, StockLedger};

#[derive(Debug, Default)]
struct LedgerState {
    entries: HashMap<ProductId, StockEntry>,
    reservations: HashMap<ReservationKey, Reservation>,
}

/// Injected failures, used to exercise callers' error paths.
#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    unavailable_products: HashSet<ProductId>,
    fail_on_confirm: bool,
    fail_on_release: bool,
    latency: Option<Duration>,
    reserve_latency: Option<Duration>,
}

impl Faults {
    fn rejects(&self, operation: &str, product_id: Option<ProductId>) -> bool {
        self.unavailable
            || product_id.is_some_and(|id| self.unavailable_products.contains(&id))
            || (operation == "confirm" && self.fail_on_confirm)
            || (operation == "release" && self.fail_on_release)
    }
}

/// Result of the write half of one optimistic attempt.
enum Commit {
    Done(ReserveOutcome),
    VersionMoved,
}

/// In-memory stock ledger.
///
/// Reads and writes take separate lock acquisitions, so a reserve can
/// observe a version that another writer moves before it commits; the
/// commit then fails its version check and the attempt is retried.
#[derive(Clone, Default)]
pub struct InMemoryStockLedger {
    state: Arc<RwLock<LedgerState>>,
    faults: Arc<Mutex<Faults>>,
    retry: ReserveRetry,
}

impl InMemoryStockLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty ledger with a custom optimistic retry bound.
    pub fn with_retry(retry: ReserveRetry) -> Self {
        Self {
            retry,
            ..Self::default()
        }
    }

    /// Creates a ledger pre-populated with `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = StockEntry>) -> Self {
        let state = LedgerState {
            entries: entries.into_iter().map(|e| (e.product_id, e)).collect(),
            reservations: HashMap::new(),
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            ..Self::default()
        }
    }

    /// Makes every call fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults().unavailable = unavailable;
    }

    /// Makes every call touching `product_id` fail as if the service were down.
    pub fn set_product_unavailable(&self, product_id: ProductId, unavailable: bool) {
        let mut faults = self.faults();
        if unavailable {
            faults.unavailable_products.insert(product_id);
        } else {
            faults.unavailable_products.remove(&product_id);
        }
    }

    /// Configures the service to fail confirm calls.
    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.faults().fail_on_confirm = fail;
    }

    /// Configures the service to fail release calls.
    pub fn set_fail_on_release(&self, fail: bool) {
        self.faults().fail_on_release = fail;
    }

    /// Delays every response by `latency`. The operation itself has already
    /// been applied when the delay starts, like a slow network reply.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults().latency = latency;
    }

    /// Like [`set_latency`](Self::set_latency), but only for reserve calls.
    pub fn set_reserve_latency(&self, latency: Option<Duration>) {
        self.faults().reserve_latency = latency;
    }

    /// Returns the current available quantity of a product.
    pub async fn available_quantity(&self, product_id: ProductId) -> Option<u32> {
        self.state
            .read()
            .await
            .entries
            .get(&product_id)
            .map(|e| e.available_quantity)
    }

    /// Returns the current version of a product's entry.
    pub async fn version(&self, product_id: ProductId) -> Option<Version> {
        self.state
            .read()
            .await
            .entries
            .get(&product_id)
            .map(|e| e.version)
    }

    /// Returns the number of outstanding reservations across all products.
    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }

    /// Returns true if a reservation exists for the key.
    pub async fn has_reservation(&self, product_id: ProductId, order_number: &OrderNumber) -> bool {
        self.state
            .read()
            .await
            .reservations
            .contains_key(&ReservationKey::new(product_id, order_number))
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_faults(&self, operation: &str, product_id: Option<ProductId>) -> Result<()> {
        if self.faults().rejects(operation, product_id) {
            return Err(LedgerError::Unavailable(format!(
                "{operation} rejected: inventory service unavailable"
            )));
        }
        Ok(())
    }

    async fn respond<T>(&self, value: T) -> T {
        let latency = self.faults().latency;
        self.delay(latency, value).await
    }

    async fn respond_to_reserve<T>(&self, value: T) -> T {
        let latency = {
            let faults = self.faults();
            faults.reserve_latency.or(faults.latency)
        };
        self.delay(latency, value).await
    }

    async fn delay<T>(&self, latency: Option<Duration>, value: T) -> T {
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        value
    }

    /// Write half of an optimistic attempt: applies the decrement only if the
    /// entry still carries `expected`.
    async fn try_commit(
        &self,
        key: &ReservationKey,
        quantity: u32,
        expected: Version,
    ) -> Commit {
        let mut state = self.state.write().await;
        let LedgerState {
            entries,
            reservations,
        } = &mut *state;

        if let Some(existing) = reservations.get(key) {
            return Commit::Done(ReserveOutcome::Reserved {
                quantity: existing.quantity,
            });
        }

        let Some(entry) = entries.get_mut(&key.product_id) else {
            return Commit::Done(ReserveOutcome::ProductNotFound);
        };
        if entry.version != expected {
            return Commit::VersionMoved;
        }
        let Some(remaining) = entry.available_quantity.checked_sub(quantity) else {
            return Commit::Done(ReserveOutcome::InsufficientStock {
                requested: quantity,
                available: entry.available_quantity,
            });
        };

        entry.available_quantity = remaining;
        entry.version = entry.version.next();
        reservations.insert(
            key.clone(),
            Reservation {
                product_id: key.product_id,
                order_number: key.order_number.clone(),
                quantity,
                created_at: Utc::now(),
            },
        );
        Commit::Done(ReserveOutcome::Reserved { quantity })
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<ProductInfo>> {
        self.check_faults("get_product", Some(product_id))?;
        let info = self
            .state
            .read()
            .await
            .entries
            .get(&product_id)
            .map(ProductInfo::from);
        Ok(self.respond(info).await)
    }

    #[tracing::instrument(skip(self, order_number), fields(order_number = %order_number))]
    async fn check_and_reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_number: &OrderNumber,
    ) -> Result<ReserveOutcome> {
        self.check_faults("reserve", Some(product_id))?;
        if quantity == 0 {
            return Err(LedgerError::InvalidQuantity {
                product_id,
                quantity,
            });
        }

        let key = ReservationKey::new(product_id, order_number);
        for attempt in 1..=self.retry.attempts() {
            // Read
            let (available, version) = {
                let state = self.state.read().await;
                if let Some(existing) = state.reservations.get(&key) {
                    let outcome = ReserveOutcome::Reserved {
                        quantity: existing.quantity,
                    };
                    drop(state);
                    return Ok(self.respond_to_reserve(outcome).await);
                }
                match state.entries.get(&product_id) {
                    Some(entry) => (entry.available_quantity, entry.version),
                    None => {
                        drop(state);
                        return Ok(self.respond_to_reserve(ReserveOutcome::ProductNotFound).await);
                    }
                }
            };

            // Decide
            if quantity > available {
                let outcome = ReserveOutcome::InsufficientStock {
                    requested: quantity,
                    available,
                };
                return Ok(self.respond_to_reserve(outcome).await);
            }

            // Write
            match self.try_commit(&key, quantity, version).await {
                Commit::Done(outcome) => return Ok(self.respond_to_reserve(outcome).await),
                Commit::VersionMoved => {
                    metrics::counter!("stock_reserve_conflicts_total").increment(1);
                    tracing::debug!(attempt, %version, "stock version moved, retrying");
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(LedgerError::ConcurrencyConflict {
            product_id,
            attempts: self.retry.attempts(),
        })
    }

    async fn confirm(
        &self,
        product_id: ProductId,
        order_number: &OrderNumber,
    ) -> Result<ConfirmOutcome> {
        self.check_faults("confirm", Some(product_id))?;
        let removed = self
            .state
            .write()
            .await
            .reservations
            .remove(&ReservationKey::new(product_id, order_number));

        let outcome = match removed {
            Some(reservation) => ConfirmOutcome::Confirmed {
                quantity: reservation.quantity,
            },
            None => ConfirmOutcome::NotFound,
        };
        Ok(self.respond(outcome).await)
    }

    async fn release(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_number: &OrderNumber,
    ) -> Result<ReleaseOutcome> {
        self.check_faults("release", Some(product_id))?;
        let outcome = {
            let mut state = self.state.write().await;
            let key = ReservationKey::new(product_id, order_number);
            match state.reservations.get(&key).map(|r| r.quantity) {
                Some(reserved) => {
                    if reserved != quantity {
                        tracing::warn!(
                            %product_id,
                            %order_number,
                            requested = quantity,
                            reserved,
                            "release quantity differs from reservation, returning reserved amount"
                        );
                    }
                    if let Some(entry) = state.entries.get_mut(&product_id) {
                        entry.available_quantity = entry
                            .available_quantity
                            .checked_add(reserved)
                            .ok_or(LedgerError::StockOverflow {
                                product_id,
                                quantity: reserved,
                            })?;
                        entry.version = entry.version.next();
                    }
                    state.reservations.remove(&key);
                    ReleaseOutcome::Released { quantity: reserved }
                }
                None => ReleaseOutcome::NotFound,
            }
        };
        Ok(self.respond(outcome).await)
    }

    async fn reservations_for_order(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Vec<Reservation>> {
        let state = self.state.read().await;
        let mut reservations: Vec<_> = state
            .reservations
            .values()
            .filter(|r| &r.order_number == order_number)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.product_id);
        Ok(reservations)
    }

    async fn upsert_product(&self, mut entry: StockEntry) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.entries.get(&entry.product_id) {
            entry.version = existing.version.next();
        }
        state.entries.insert(entry.product_id, entry);
        Ok(())
    }

    async fn restock(&self, product_id: ProductId, quantity: u32) -> Result<Option<u32>> {
        let mut state = self.state.write().await;
        let Some(entry) = state.entries.get_mut(&product_id) else {
            return Ok(None);
        };
        entry.available_quantity = entry
            .available_quantity
            .checked_add(quantity)
            .ok_or(LedgerError::StockOverflow {
                product_id,
                quantity,
            })?;
        entry.version = entry.version.next();
        Ok(Some(entry.available_quantity))
    }

    async fn low_stock(&self) -> Result<Vec<StockEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .entries
            .values()
            .filter(|e| e.needs_reorder())
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.product_id);
        Ok(entries)
    }
}
