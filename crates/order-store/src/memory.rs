use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{OrderId, OrderNumber, Version};
use domain::Order;
use tokio::sync::RwLock;

use crate::{OrderQuery, OrderRepository, Result, StoreError};

/// In-memory order repository for tests and the demo server.
///
/// Provides the same version checks as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    fail_on_save: Arc<AtomicBool>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every save fail, to exercise callers' rollback paths.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.fail_on_save.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn save(&self, order: &Order) -> Result<Version> {
        if self.fail_on_save.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("save rejected".to_string()));
        }

        let mut orders = self.orders.write().await;
        let expected = order.version();
        let actual = orders
            .get(&order.id())
            .map(|stored| stored.version())
            .unwrap_or(Version::initial());

        if actual != expected {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected,
                actual,
            });
        }
        if expected == Version::initial()
            && orders
                .values()
                .any(|stored| stored.order_number() == order.order_number())
        {
            return Err(StoreError::DuplicateOrderNumber(
                order.order_number().clone(),
            ));
        }

        let new_version = expected.next();
        let mut stored = order.clone();
        stored.set_version(new_version);
        orders.insert(order.id(), stored);
        Ok(new_version)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn get_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|order| order.order_number() == order_number)
            .cloned())
    }

    async fn list(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<_> = orders
            .values()
            .filter(|order| {
                if let Some(customer_id) = query.customer_id
                    && order.customer_id() != customer_id
                {
                    return false;
                }
                if let Some(status) = query.status
                    && order.status() != status
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        Ok(matching
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn delete(&self, order_id: OrderId) -> Result<bool> {
        Ok(self.orders.write().await.remove(&order_id).is_some())
    }
}
