//! Concurrency tests for the in-memory stock ledger.

use chrono::Utc;
use common::{Money, OrderNumber, ProductId};
use futures_util::future::join_all;
use inventory::{
    InMemoryStockLedger, LedgerError, ReleaseOutcome, ReserveOutcome, ReserveRetry, StockEntry,
    StockLedger,
};

fn seeded(available: u32) -> InMemoryStockLedger {
    InMemoryStockLedger::with_entries([StockEntry::new(
        ProductId::new(1),
        "SKU-001",
        "Widget",
        Money::from_cents(1_000),
        available,
    )])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reservers_never_oversell() {
    let ledger = seeded(10);
    let numbers: Vec<OrderNumber> = (0..40).map(|_| OrderNumber::generate(Utc::now())).collect();

    let outcomes = join_all(numbers.iter().map(|number| {
        let ledger = ledger.clone();
        let number = number.clone();
        async move {
            tokio::spawn(async move {
                ledger
                    .check_and_reserve(ProductId::new(1), 1, &number)
                    .await
            })
            .await
            .unwrap()
        }
    }))
    .await;

    let mut reserved = 0u32;
    for outcome in outcomes {
        match outcome {
            Ok(ReserveOutcome::Reserved { quantity }) => reserved += quantity,
            Ok(ReserveOutcome::InsufficientStock { .. }) => {}
            Err(LedgerError::ConcurrencyConflict { .. }) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    let remaining = ledger.available_quantity(ProductId::new(1)).await.unwrap();
    assert!(reserved <= 10);
    assert_eq!(remaining + reserved, 10);
    assert_eq!(ledger.reservation_count().await as u32, reserved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_key_reserved_concurrently_is_taken_once() {
    let ledger = seeded(10);
    let number = OrderNumber::generate(Utc::now());

    let outcomes = join_all((0..8).map(|_| {
        let ledger = ledger.clone();
        let number = number.clone();
        async move {
            ledger
                .check_and_reserve(ProductId::new(1), 3, &number)
                .await
        }
    }))
    .await;

    for outcome in outcomes.into_iter().flatten() {
        assert_eq!(outcome, ReserveOutcome::Reserved { quantity: 3 });
    }
    assert_eq!(ledger.available_quantity(ProductId::new(1)).await, Some(7));
    assert_eq!(ledger.reservation_count().await, 1);
}

#[tokio::test]
async fn release_after_reserve_restores_stock_exactly() {
    let ledger = seeded(4);
    let numbers: Vec<OrderNumber> = (0..4).map(|_| OrderNumber::generate(Utc::now())).collect();

    for number in &numbers {
        ledger
            .check_and_reserve(ProductId::new(1), 1, number)
            .await
            .unwrap();
    }
    assert_eq!(ledger.available_quantity(ProductId::new(1)).await, Some(0));

    for number in &numbers {
        let outcome = ledger.release(ProductId::new(1), 1, number).await.unwrap();
        assert_eq!(outcome, ReleaseOutcome::Released { quantity: 1 });
    }
    assert_eq!(ledger.available_quantity(ProductId::new(1)).await, Some(4));
    assert_eq!(ledger.reservation_count().await, 0);
}

#[tokio::test]
async fn single_attempt_budget_still_succeeds_without_contention() {
    let ledger = InMemoryStockLedger::with_retry(ReserveRetry { max_attempts: 1 });
    ledger
        .upsert_product(StockEntry::new(
            ProductId::new(5),
            "SKU-005",
            "Bolt",
            Money::from_cents(25),
            2,
        ))
        .await
        .unwrap();

    let outcome = ledger
        .check_and_reserve(ProductId::new(5), 2, &OrderNumber::generate(Utc::now()))
        .await
        .unwrap();

    assert_eq!(outcome, ReserveOutcome::Reserved { quantity: 2 });
}
