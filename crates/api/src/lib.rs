//! HTTP API server for the order fulfillment core.
//!
//! Exposes order creation, lookup and status changes over REST, with
//! structured logging (tracing) and Prometheus metrics. The server runs
//! against PostgreSQL when configured, or fully in memory with a small
//! demo catalog otherwise.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use common::{Money, ProductId};
use fulfillment::{InventoryGateway, OrderCoordinator};
use inventory::{InMemoryStockLedger, StockEntry, StockLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderRepository, OrderRepository};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
pub use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, R>(state: Arc<AppState<L, R>>, metrics_handle: PrometheusHandle) -> Router
where
    L: StockLedger + 'static,
    R: OrderRepository + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<L, R>))
        .route("/orders", get(routes::orders::list::<L, R>))
        .route("/orders/{id}", get(routes::orders::get::<L, R>))
        .route(
            "/orders/by-number/{order_number}",
            get(routes::orders::get_by_number::<L, R>),
        )
        .route(
            "/orders/{id}/status",
            post(routes::orders::update_status::<L, R>),
        )
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<L, R>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires a coordinator over the given ledger and repository.
pub fn create_state<L, R>(ledger: L, repository: R, config: &Config) -> Arc<AppState<L, R>>
where
    L: StockLedger,
    R: OrderRepository,
{
    let gateway = InventoryGateway::with_config(ledger, config.gateway());
    Arc::new(AppState {
        coordinator: OrderCoordinator::new(gateway, repository, config.coordinator()),
    })
}

/// Creates state backed by in-memory stores, seeded with [`demo_catalog`].
pub fn create_in_memory_state(
    config: &Config,
) -> Arc<AppState<InMemoryStockLedger, InMemoryOrderRepository>> {
    create_state(
        InMemoryStockLedger::with_entries(demo_catalog()),
        InMemoryOrderRepository::new(),
        config,
    )
}

/// Products available when running without a database.
pub fn demo_catalog() -> Vec<StockEntry> {
    vec![
        StockEntry::new(
            ProductId::new(1),
            "KB-001",
            "Mechanical Keyboard",
            Money::from_cents(8_999),
            25,
        )
        .with_category("peripherals")
        .with_reorder_level(5),
        StockEntry::new(
            ProductId::new(2),
            "MS-002",
            "Wireless Mouse",
            Money::from_cents(2_999),
            50,
        )
        .with_category("peripherals")
        .with_reorder_level(10),
        StockEntry::new(
            ProductId::new(3),
            "MN-003",
            "27\" Monitor",
            Money::from_cents(24_900),
            8,
        )
        .with_category("displays")
        .with_reorder_level(2),
        StockEntry::new(
            ProductId::new(4),
            "CB-004",
            "USB-C Cable",
            Money::from_cents(1_299),
            1,
        )
        .with_category("accessories"),
    ]
}

/// Registers descriptions for the metrics the core emits.
pub fn describe_metrics() {
    metrics::describe_counter!("orders_created_total", "Orders created and confirmed");
    metrics::describe_counter!(
        "orders_rejected_total",
        "Order creations that failed, by error kind"
    );
    metrics::describe_histogram!(
        "order_create_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent creating an order, including compensation"
    );
    metrics::describe_counter!(
        "order_status_transitions_total",
        "Status changes applied, by target status"
    );
    metrics::describe_counter!(
        "saga_compensations_total",
        "Order creations that had to release reservations"
    );
    metrics::describe_counter!(
        "reservation_reconciliation_gaps_total",
        "Confirm or release calls that failed after the order changed"
    );
    metrics::describe_counter!(
        "stock_reserve_conflicts_total",
        "Optimistic stock updates that lost to a concurrent writer"
    );
    metrics::describe_counter!(
        "inventory_gateway_retries_total",
        "Inventory calls retried after a transient failure"
    );
    metrics::describe_counter!(
        "inventory_gateway_unreachable_total",
        "Inventory calls that failed every attempt"
    );
}
