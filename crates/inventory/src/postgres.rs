use async_trait::async_trait;
use chrono::Utc;
use common::{Money, OrderNumber, ProductId, Version};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::types::{
    ConfirmOutcome, ProductInfo, ReleaseOutcome, Reservation, ReserveOutcome, ReserveRetry,
    StockEntry,
};
use crate::{LedgerError, Result, StockLedger};

const ENTRY_COLUMNS: &str = "product_id, sku, name, description, category, unit_price_cents, \
                             available_quantity, reorder_level, version";

/// PostgreSQL-backed stock ledger.
///
/// Reserve runs the same read-decide-write loop as the in-memory ledger:
/// the decrement is an `UPDATE ... WHERE version = $expected`, and zero
/// affected rows means another writer got there first.
#[derive(Clone)]
pub struct PostgresStockLedger {
    pool: PgPool,
    retry: ReserveRetry,
}

impl PostgresStockLedger {
    /// Creates a new PostgreSQL stock ledger.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retry: ReserveRetry::default(),
        }
    }

    /// Overrides the optimistic retry bound.
    pub fn with_retry(mut self, retry: ReserveRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_entry(row: PgRow) -> Result<StockEntry> {
        Ok(StockEntry {
            product_id: ProductId::new(row.try_get("product_id")?),
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            available_quantity: to_quantity(row.try_get("available_quantity")?)?,
            reorder_level: to_quantity(row.try_get("reorder_level")?)?,
            version: Version::new(row.try_get("version")?),
        })
    }

    async fn reserved_quantity(
        &self,
        product_id: ProductId,
        order_number: &OrderNumber,
    ) -> Result<Option<u32>> {
        let quantity: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM stock_reservations WHERE product_id = $1 AND order_number = $2",
        )
        .bind(product_id.as_i64())
        .bind(order_number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        quantity.map(to_quantity).transpose()
    }
}

fn to_quantity(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| LedgerError::Corrupt(format!("quantity out of range: {value}")))
}

#[async_trait]
impl StockLedger for PostgresStockLedger {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<ProductInfo>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM stock_entries WHERE product_id = $1"
        ))
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_entry(row).map(|entry| ProductInfo::from(&entry)))
            .transpose()
    }

    #[tracing::instrument(skip(self, order_number), fields(order_number = %order_number))]
    async fn check_and_reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_number: &OrderNumber,
    ) -> Result<ReserveOutcome> {
        if quantity == 0 {
            return Err(LedgerError::InvalidQuantity {
                product_id,
                quantity,
            });
        }

        for attempt in 1..=self.retry.attempts() {
            if let Some(existing) = self.reserved_quantity(product_id, order_number).await? {
                return Ok(ReserveOutcome::Reserved { quantity: existing });
            }

            let row = sqlx::query(
                "SELECT available_quantity, version FROM stock_entries WHERE product_id = $1",
            )
            .bind(product_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
            let Some(row) = row else {
                return Ok(ReserveOutcome::ProductNotFound);
            };
            let available = to_quantity(row.try_get("available_quantity")?)?;
            let version: i64 = row.try_get("version")?;

            if quantity > available {
                return Ok(ReserveOutcome::InsufficientStock {
                    requested: quantity,
                    available,
                });
            }

            let mut tx = self.pool.begin().await?;

            let updated = sqlx::query(
                r#"
                UPDATE stock_entries
                SET available_quantity = available_quantity - $2, version = version + 1
                WHERE product_id = $1 AND version = $3 AND available_quantity >= $2
                "#,
            )
            .bind(product_id.as_i64())
            .bind(i64::from(quantity))
            .bind(version)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if updated == 0 {
                tx.rollback().await?;
                metrics::counter!("stock_reserve_conflicts_total").increment(1);
                tracing::debug!(attempt, version, "stock version moved, retrying");
                continue;
            }

            let inserted = sqlx::query(
                r#"
                INSERT INTO stock_reservations (product_id, order_number, quantity, created_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (product_id, order_number) DO NOTHING
                "#,
            )
            .bind(product_id.as_i64())
            .bind(order_number.as_str())
            .bind(i64::from(quantity))
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                // A concurrent call with the same key won; undo our decrement.
                tx.rollback().await?;
                let existing = self
                    .reserved_quantity(product_id, order_number)
                    .await?
                    .unwrap_or(quantity);
                return Ok(ReserveOutcome::Reserved { quantity: existing });
            }

            tx.commit().await?;
            return Ok(ReserveOutcome::Reserved { quantity });
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
        let removed: Option<i64> = sqlx::query_scalar(
            r#"
            DELETE FROM stock_reservations
            WHERE product_id = $1 AND order_number = $2
            RETURNING quantity
            "#,
        )
        .bind(product_id.as_i64())
        .bind(order_number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match removed {
            Some(quantity) => Ok(ConfirmOutcome::Confirmed {
                quantity: to_quantity(quantity)?,
            }),
            None => Ok(ConfirmOutcome::NotFound),
        }
    }

    async fn release(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_number: &OrderNumber,
    ) -> Result<ReleaseOutcome> {
        let mut tx = self.pool.begin().await?;

        let removed: Option<i64> = sqlx::query_scalar(
            r#"
            DELETE FROM stock_reservations
            WHERE product_id = $1 AND order_number = $2
            RETURNING quantity
            "#,
        )
        .bind(product_id.as_i64())
        .bind(order_number.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(reserved) = removed else {
            tx.rollback().await?;
            return Ok(ReleaseOutcome::NotFound);
        };
        let reserved = to_quantity(reserved)?;
        if reserved != quantity {
            tracing::warn!(
                %product_id,
                %order_number,
                requested = quantity,
                reserved,
                "release quantity differs from reservation, returning reserved amount"
            );
        }

        sqlx::query(
            r#"
            UPDATE stock_entries
            SET available_quantity = available_quantity + $2, version = version + 1
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_i64())
        .bind(i64::from(reserved))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ReleaseOutcome::Released { quantity: reserved })
    }

    async fn reservations_for_order(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity, created_at
            FROM stock_reservations
            WHERE order_number = $1
            ORDER BY product_id ASC
            "#,
        )
        .bind(order_number.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Reservation {
                    product_id: ProductId::new(row.try_get("product_id")?),
                    order_number: order_number.clone(),
                    quantity: to_quantity(row.try_get("quantity")?)?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn upsert_product(&self, entry: StockEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_entries
                (product_id, sku, name, description, category, unit_price_cents,
                 available_quantity, reorder_level, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0)
            ON CONFLICT (product_id) DO UPDATE SET
                sku = EXCLUDED.sku,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                unit_price_cents = EXCLUDED.unit_price_cents,
                available_quantity = EXCLUDED.available_quantity,
                reorder_level = EXCLUDED.reorder_level,
                version = stock_entries.version + 1
            "#,
        )
        .bind(entry.product_id.as_i64())
        .bind(&entry.sku)
        .bind(&entry.name)
        .bind(&entry.description)
        .bind(&entry.category)
        .bind(entry.unit_price.cents())
        .bind(i64::from(entry.available_quantity))
        .bind(i64::from(entry.reorder_level))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn restock(&self, product_id: ProductId, quantity: u32) -> Result<Option<u32>> {
        let level: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE stock_entries
            SET available_quantity = available_quantity + $2, version = version + 1
            WHERE product_id = $1 AND available_quantity + $2 <= $3
            RETURNING available_quantity
            "#,
        )
        .bind(product_id.as_i64())
        .bind(i64::from(quantity))
        .bind(i64::from(u32::MAX))
        .fetch_optional(&self.pool)
        .await?;

        match level {
            Some(level) => to_quantity(level).map(Some),
            None if self.get_product(product_id).await?.is_some() => {
                Err(LedgerError::StockOverflow {
                    product_id,
                    quantity,
                })
            }
            None => Ok(None),
        }
    }

    async fn low_stock(&self) -> Result<Vec<StockEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM stock_entries \
             WHERE available_quantity <= reorder_level ORDER BY product_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }
}
