use std::str::FromStr;

use async_trait::async_trait;
use common::{CustomerId, LineId, Money, OrderId, OrderNumber, ProductId, Version};
use domain::{LineStatus, Order, OrderLine, OrderParts, OrderStatus, PaymentStatus};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{OrderQuery, OrderRepository, Result, StoreError};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, customer_name, shipping_address, \
                             status, payment_status, subtotal_cents, tax_cents, shipping_cents, \
                             discount_cents, total_cents, created_at, updated_at, \
                             expected_delivery_date, actual_delivery_date, version";

/// PostgreSQL-backed order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new PostgreSQL order repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
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

    async fn insert(&self, order: &Order) -> Result<Version> {
        let mut tx = self.pool.begin().await?;
        let version = Version::first();

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        ))
        .bind(order.id().as_uuid())
        .bind(order.order_number().as_str())
        .bind(order.customer_id().as_uuid())
        .bind(order.customer_name())
        .bind(order.shipping_address())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.subtotal().cents())
        .bind(order.tax_amount().cents())
        .bind(order.shipping_amount().cents())
        .bind(order.discount_amount().cents())
        .bind(order.total_amount().cents())
        .bind(order.created_at())
        .bind(order.updated_at())
        .bind(order.expected_delivery_date())
        .bind(order.actual_delivery_date())
        .bind(version.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some("orders_pkey") => {
                        return StoreError::ConcurrencyConflict {
                            order_id: order.id(),
                            expected: Version::initial(),
                            actual: Version::first(),
                        };
                    }
                    Some("orders_order_number_key") => {
                        return StoreError::DuplicateOrderNumber(order.order_number().clone());
                    }
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        for (position, line) in order.lines().iter().enumerate() {
            Self::insert_line(&mut tx, order.id(), position, line).await?;
        }

        tx.commit().await?;
        Ok(version)
    }

    async fn insert_line(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        position: usize,
        line: &OrderLine,
    ) -> Result<()> {
        let position = i32::try_from(position)
            .map_err(|_| StoreError::Corrupt(format!("line position out of range: {position}")))?;

        sqlx::query(
            r#"
            INSERT INTO order_lines
                (id, order_id, position, product_id, sku, name, unit_price_cents, quantity,
                 total_price_cents, discount_cents, tax_cents, final_price_cents, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(order_id.as_uuid())
        .bind(position)
        .bind(line.product_id.as_i64())
        .bind(&line.sku)
        .bind(&line.name)
        .bind(line.unit_price.cents())
        .bind(i64::from(line.quantity))
        .bind(line.total_price.cents())
        .bind(line.discount_amount.cents())
        .bind(line.tax_amount.cents())
        .bind(line.final_price.cents())
        .bind(line.status.as_str())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn update(&self, order: &Order) -> Result<Version> {
        let expected = order.version();
        let new_version = expected.next();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = $3, payment_status = $4, discount_cents = $5, total_cents = $6,
                updated_at = $7, actual_delivery_date = $8, version = $9
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(expected.as_i64())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.discount_amount().cents())
        .bind(order.total_amount().cents())
        .bind(order.updated_at())
        .bind(order.actual_delivery_date())
        .bind(new_version.as_i64())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                .bind(order.id().as_uuid())
                .fetch_optional(&self.pool)
                .await?;
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected,
                actual: actual.map(Version::new).unwrap_or(Version::initial()),
            });
        }

        for line in order.lines() {
            sqlx::query("UPDATE order_lines SET status = $2 WHERE id = $1")
                .bind(line.id.as_uuid())
                .bind(line.status.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(new_version)
    }

    async fn load_lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, sku, name, unit_price_cents, quantity, total_price_cents,
                   discount_cents, tax_cents, final_price_cents, status
            FROM order_lines
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        let quantity: i64 = row.try_get("quantity")?;
        Ok(OrderLine {
            id: LineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::Corrupt(format!("line quantity out of range: {quantity}")))?,
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            discount_amount: Money::from_cents(row.try_get("discount_cents")?),
            tax_amount: Money::from_cents(row.try_get("tax_cents")?),
            final_price: Money::from_cents(row.try_get("final_price_cents")?),
            status: parse_status::<LineStatus>(&row, "status")?,
        })
    }

    async fn row_to_order(&self, row: PgRow) -> Result<Order> {
        let id: Uuid = row.try_get("id")?;
        let order_number: String = row.try_get("order_number")?;
        let lines = self.load_lines(id).await?;

        let parts = OrderParts {
            id: OrderId::from_uuid(id),
            order_number: OrderNumber::parse(order_number)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            customer_name: row.try_get("customer_name")?,
            shipping_address: row.try_get("shipping_address")?,
            status: parse_status::<OrderStatus>(&row, "status")?,
            payment_status: parse_status::<PaymentStatus>(&row, "payment_status")?,
            lines,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            tax_amount: Money::from_cents(row.try_get("tax_cents")?),
            shipping_amount: Money::from_cents(row.try_get("shipping_cents")?),
            discount_amount: Money::from_cents(row.try_get("discount_cents")?),
            total_amount: Money::from_cents(row.try_get("total_cents")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            expected_delivery_date: row.try_get("expected_delivery_date")?,
            actual_delivery_date: row.try_get("actual_delivery_date")?,
            version: Version::new(row.try_get("version")?),
        };

        Order::from_parts(parts).map_err(|e| StoreError::Corrupt(format!("order {id}: {e}")))
    }
}

fn parse_status<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: T::Err| StoreError::Corrupt(format!("{column}: {e}")))
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id(), version = %order.version()))]
    async fn save(&self, order: &Order) -> Result<Version> {
        if order.version() == Version::initial() {
            self.insert(order).await
        } else {
            self.update(order).await
        }
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_order(row).await?)),
            None => Ok(None),
        }
    }

    async fn get_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_order(row).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;

        if query.customer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ${}", param_count));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${}", param_count));
        }

        sql.push_str(" ORDER BY created_at DESC");

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        let mut q = sqlx::query(&sql);
        if let Some(customer_id) = query.customer_id {
            q = q.bind(customer_id.as_uuid());
        }
        if let Some(status) = query.status {
            q = q.bind(status.as_str());
        }

        let rows = q.fetch_all(&self.pool).await?;
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.row_to_order(row).await?);
        }
        Ok(orders)
    }

    async fn delete(&self, order_id: OrderId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}
