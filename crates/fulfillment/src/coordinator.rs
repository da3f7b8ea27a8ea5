//! Order coordinator: creation saga and status transitions.

use std::time::Instant;

use chrono::{Duration, Utc};
use common::{OrderId, OrderNumber, ProductId};
use domain::{Order, OrderLine, OrderStatus, PlaceOrder, ProductSnapshot};
use inventory::{ConfirmOutcome, ReleaseOutcome, ReserveOutcome, StockLedger};
use order_store::{OrderQuery, OrderRepository};

use crate::compensation::Compensation;
use crate::config::CoordinatorConfig;
use crate::error::{FulfillmentError, GatewayError, Result};
use crate::gateway::InventoryGateway;

/// Orchestrates order creation, cancellation and status transitions.
///
/// Orders are only created and mutated through the coordinator, which keeps
/// the order store and the stock ledger consistent:
/// - creation reserves every line or none of them
/// - `SHIPPED` confirms every line's reservation
/// - `CANCELLED`, `RETURNED` or `REFUNDED` before shipment releases them
///
/// Ledger failures after a status change is saved do not undo the change.
/// They are logged as reconciliation gaps.
pub struct OrderCoordinator<L, R>
where
    L: StockLedger,
    R: OrderRepository,
{
    gateway: InventoryGateway<L>,
    repository: R,
    config: CoordinatorConfig,
}

impl<L, R> OrderCoordinator<L, R>
where
    L: StockLedger,
    R: OrderRepository,
{
    /// Creates a new coordinator.
    pub fn new(gateway: InventoryGateway<L>, repository: R, config: CoordinatorConfig) -> Self {
        Self {
            gateway,
            repository,
            config,
        }
    }

    pub fn gateway(&self) -> &InventoryGateway<L> {
        &self.gateway
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Creates an order, reserving stock for every line.
    ///
    /// Returns the persisted order in `CONFIRMED` status. On any error no
    /// order is stored and no reservation made by this call remains, except
    /// where a compensating release itself failed (logged).
    #[tracing::instrument(skip(self, request), fields(customer_id = %request.customer_id, lines = request.lines.len()))]
    pub async fn create_order(&self, request: PlaceOrder) -> Result<Order> {
        let started = Instant::now();
        let result = self.place(request).await;
        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id(),
                    order_number = %order.order_number(),
                    total = %order.total_amount(),
                    "order created"
                );
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.kind()).increment(1);
                tracing::info!(error = %e, "order rejected");
            }
        }
        result
    }

    async fn place(&self, request: PlaceOrder) -> Result<Order> {
        request.validate()?;

        let now = Utc::now();
        let order_number = OrderNumber::generate(now);
        let pricing = &self.config.pricing;

        // Validate every line before touching stock.
        let mut lines = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = self
                .gateway
                .get_product(line.product_id)
                .await?
                .ok_or(FulfillmentError::ProductNotFound {
                    product_id: line.product_id,
                })?;
            let snapshot = ProductSnapshot::new(
                product.product_id,
                product.sku,
                product.name,
                product.unit_price,
            );
            lines.push(OrderLine::new(snapshot, line.quantity, pricing)?);
        }

        let lead_days = self.config.delivery_lead_days;
        let expected_delivery = Duration::try_days(i64::from(lead_days))
            .and_then(|lead| now.checked_add_signed(lead));
        if expected_delivery.is_none() {
            tracing::warn!(lead_days, "delivery lead out of range, expected delivery left unset");
        }
        let mut order = Order::place(
            order_number.clone(),
            &request,
            lines,
            pricing,
            now,
            expected_delivery,
        )?;

        let mut compensation = Compensation::new(order_number.clone());
        for line in order.lines() {
            if let Err(e) = self
                .reserve_line(line.product_id, line.quantity, &order_number, &mut compensation)
                .await
            {
                return self.abort(compensation, e).await;
            }
        }

        if let Err(e) = order.transition_to(OrderStatus::Confirmed, now) {
            return self.abort(compensation, e.into()).await;
        }
        match self.repository.save(&order).await {
            Ok(version) => order.set_version(version),
            Err(e) => return self.abort(compensation, e.into()).await,
        }

        Ok(order)
    }

    /// Reserves one line, recording its release on success or when the
    /// outcome is unknown.
    async fn reserve_line(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_number: &OrderNumber,
        compensation: &mut Compensation,
    ) -> Result<()> {
        match self.gateway.reserve(product_id, quantity, order_number).await {
            Ok(ReserveOutcome::Reserved { .. }) => {
                compensation.record_release(product_id, quantity);
                Ok(())
            }
            Ok(ReserveOutcome::InsufficientStock {
                requested,
                available,
            }) => Err(FulfillmentError::InsufficientStock {
                product_id,
                requested,
                available,
            }),
            Ok(ReserveOutcome::ProductNotFound) => {
                Err(FulfillmentError::ProductNotFound { product_id })
            }
            Err(e @ GatewayError::Unreachable { .. }) => {
                // The ledger may have applied the reserve after we gave up.
                compensation.record_release(product_id, quantity);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn abort<T>(&self, compensation: Compensation, error: FulfillmentError) -> Result<T> {
        let order_number = compensation.order_number().clone();
        let report = compensation.run(&self.gateway).await;
        if !report.is_complete() {
            tracing::warn!(
                %order_number,
                failed = report.failed.len(),
                "order creation compensated with outstanding reservations"
            );
        }
        Err(error)
    }

    /// Moves an order to `to`, confirming or releasing its reservations as
    /// the transition requires.
    #[tracing::instrument(skip(self), fields(%order_id, %to))]
    pub async fn update_order_status(&self, order_id: OrderId, to: OrderStatus) -> Result<Order> {
        let order = self.get_order(order_id).await?;
        self.transition(order, to).await
    }

    /// Cancels an order that has not shipped yet, releasing its reservations.
    ///
    /// Shipped and delivered orders fail with `IllegalState`; other
    /// impossible cancellations fail with `InvalidTransition`.
    #[tracing::instrument(skip(self), fields(%order_id))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.get_order(order_id).await?;
        if order.status().is_shipped_or_later() {
            return Err(FulfillmentError::IllegalState {
                order_id,
                status: order.status(),
            });
        }
        self.transition(order, OrderStatus::Cancelled).await
    }

    async fn transition(&self, mut order: Order, to: OrderStatus) -> Result<Order> {
        let from = order.transition_to(to, Utc::now())?;
        let version = self.repository.save(&order).await?;
        order.set_version(version);

        match to {
            OrderStatus::Shipped => self.confirm_reservations(&order).await,
            OrderStatus::Cancelled | OrderStatus::Returned | OrderStatus::Refunded
                if from.holds_reservations() =>
            {
                self.release_reservations(&order).await
            }
            _ => {}
        }

        metrics::counter!("order_status_transitions_total", "to" => to.as_str()).increment(1);
        tracing::info!(
            order_number = %order.order_number(),
            %from,
            %to,
            "order status changed"
        );
        Ok(order)
    }

    async fn confirm_reservations(&self, order: &Order) {
        for line in order.lines() {
            match self
                .gateway
                .confirm(line.product_id, order.order_number())
                .await
            {
                Ok(ConfirmOutcome::Confirmed { .. }) => {}
                Ok(ConfirmOutcome::NotFound) => {
                    tracing::debug!(product_id = %line.product_id, "no reservation to confirm");
                }
                Err(e) => reconciliation_gap("confirm", order.order_number(), line.product_id, &e),
            }
        }
    }

    async fn release_reservations(&self, order: &Order) {
        for line in order.lines() {
            match self
                .gateway
                .release(line.product_id, line.quantity, order.order_number())
                .await
            {
                Ok(ReleaseOutcome::Released { .. }) => {}
                Ok(ReleaseOutcome::NotFound) => {
                    tracing::debug!(product_id = %line.product_id, "no reservation to release");
                }
                Err(e) => reconciliation_gap("release", order.order_number(), line.product_id, &e),
            }
        }
    }

    /// Loads an order by ID.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.repository
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))
    }

    /// Loads an order by its order number.
    pub async fn get_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>> {
        Ok(self.repository.get_by_number(order_number).await?)
    }

    /// Lists orders, newest first.
    pub async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        Ok(self.repository.list(query).await?)
    }
}

fn reconciliation_gap(
    operation: &'static str,
    order_number: &OrderNumber,
    product_id: ProductId,
    error: &GatewayError,
) {
    metrics::counter!("reservation_reconciliation_gaps_total", "operation" => operation)
        .increment(1);
    tracing::warn!(
        %order_number,
        %product_id,
        operation,
        %error,
        "reservation reconciliation gap"
    );
}
