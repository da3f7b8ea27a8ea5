//! PostgreSQL stock ledger integration tests
//!
//! These tests need Docker and use a shared PostgreSQL container.
//! Run with:
//!
//! ```bash
//! cargo test -p inventory --test postgres_ledger -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{Money, OrderNumber, ProductId};
use futures_util::future::join_all;
use inventory::{
    ConfirmOutcome, LedgerError, PostgresStockLedger, ReleaseOutcome, ReserveOutcome, StockEntry,
    StockLedger,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/0001_create_stock_ledger.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_ledger() -> PostgresStockLedger {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE stock_reservations, stock_entries")
        .execute(&pool)
        .await
        .unwrap();

    let ledger = PostgresStockLedger::new(pool);
    ledger
        .upsert_product(
            StockEntry::new(
                ProductId::new(1),
                "SKU-001",
                "Widget",
                Money::from_cents(10_000),
                5,
            )
            .with_category("hardware"),
        )
        .await
        .unwrap();
    ledger
        .upsert_product(
            StockEntry::new(
                ProductId::new(2),
                "SKU-002",
                "Gadget",
                Money::from_cents(5_000),
                1,
            )
            .with_reorder_level(2),
        )
        .await
        .unwrap();
    ledger
}

fn order_number() -> OrderNumber {
    OrderNumber::generate(Utc::now())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_get_product() {
    let ledger = get_test_ledger().await;

    let info = ledger.get_product(ProductId::new(1)).await.unwrap().unwrap();
    assert_eq!(info.sku, "SKU-001");
    assert_eq!(info.category, "hardware");
    assert_eq!(info.unit_price, Money::from_cents(10_000));
    assert_eq!(info.available_quantity, 5);

    assert!(ledger.get_product(ProductId::new(99)).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_reserve_confirm_release_cycle() {
    let ledger = get_test_ledger().await;
    let number = order_number();

    let reserved = ledger
        .check_and_reserve(ProductId::new(1), 2, &number)
        .await
        .unwrap();
    assert_eq!(reserved, ReserveOutcome::Reserved { quantity: 2 });

    let again = ledger
        .check_and_reserve(ProductId::new(1), 2, &number)
        .await
        .unwrap();
    assert_eq!(again, ReserveOutcome::Reserved { quantity: 2 });

    let held = ledger.reservations_for_order(&number).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].quantity, 2);

    let confirmed = ledger.confirm(ProductId::new(1), &number).await.unwrap();
    assert_eq!(confirmed, ConfirmOutcome::Confirmed { quantity: 2 });
    let released = ledger.release(ProductId::new(1), 2, &number).await.unwrap();
    assert_eq!(released, ReleaseOutcome::NotFound);

    let info = ledger.get_product(ProductId::new(1)).await.unwrap().unwrap();
    assert_eq!(info.available_quantity, 3);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_release_returns_stock() {
    let ledger = get_test_ledger().await;
    let number = order_number();

    ledger
        .check_and_reserve(ProductId::new(1), 4, &number)
        .await
        .unwrap();
    let released = ledger.release(ProductId::new(1), 4, &number).await.unwrap();

    assert_eq!(released, ReleaseOutcome::Released { quantity: 4 });
    let info = ledger.get_product(ProductId::new(1)).await.unwrap().unwrap();
    assert_eq!(info.available_quantity, 5);
    assert!(ledger.reservations_for_order(&number).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_insufficient_stock_is_not_clamped() {
    let ledger = get_test_ledger().await;

    let outcome = ledger
        .check_and_reserve(ProductId::new(2), 2, &order_number())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ReserveOutcome::InsufficientStock {
            requested: 2,
            available: 1
        }
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_concurrent_reservers_never_oversell() {
    let ledger = get_test_ledger().await;
    let numbers: Vec<OrderNumber> = (0..12).map(|_| order_number()).collect();

    let outcomes = join_all(
        numbers
            .iter()
            .map(|number| ledger.check_and_reserve(ProductId::new(1), 1, number)),
    )
    .await;

    let reserved: u32 = outcomes
        .into_iter()
        .filter_map(|o| match o {
            Ok(ReserveOutcome::Reserved { quantity }) => Some(quantity),
            _ => None,
        })
        .sum();
    let info = ledger.get_product(ProductId::new(1)).await.unwrap().unwrap();

    assert!(reserved <= 5);
    assert_eq!(info.available_quantity + reserved, 5);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_restock_and_low_stock() {
    let ledger = get_test_ledger().await;

    let low = ledger.low_stock().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].product_id, ProductId::new(2));

    assert_eq!(
        ledger.restock(ProductId::new(2), 10).await.unwrap(),
        Some(11)
    );
    assert!(ledger.low_stock().await.unwrap().is_empty());
    assert_eq!(ledger.restock(ProductId::new(42), 1).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_restock_past_max_is_rejected_unchanged() {
    let ledger = get_test_ledger().await;

    let err = ledger
        .restock(ProductId::new(1), u32::MAX)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::StockOverflow { .. }));
    let info = ledger.get_product(ProductId::new(1)).await.unwrap().unwrap();
    assert_eq!(info.available_quantity, 5);
}
