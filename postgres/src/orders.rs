//! `PostgreSQL`-backed order store.
//!
//! One checkout maps to one `sqlx` transaction: header insert, line
//! inserts, commit. The engine never touches inventory inside this
//! transaction: reserved stock is consumed by the sale, not returned.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use storefront_core::error::StoreError;
use storefront_core::orders::{OrderStore, OrderTransaction};
use storefront_core::types::{OrderHeader, OrderId, OrderLine};

/// Production order store over a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a store with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(db_error)?;
        Ok(Box::new(PgOrderTransaction { tx }))
    }
}

struct PgOrderTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTransaction for PgOrderTransaction {
    async fn insert_order(&mut self, header: &OrderHeader) -> Result<OrderId, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO orders (owner_id, placed_at, status, total_cents)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(header.owner_id.as_i64())
        .bind(header.placed_at)
        .bind(header.status.as_str())
        .bind(cents_to_i64(header.total.cents())?)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(OrderId::new(id))
    }

    async fn insert_line(&mut self, order_id: OrderId, line: &OrderLine) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO order_lines (order_id, product_id, quantity, unit_price_cents)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(order_id.as_i64())
        .bind(line.product_id.as_i64())
        .bind(i64::from(line.quantity))
        .bind(cents_to_i64(line.unit_price.cents())?)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(db_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(db_error)
    }
}

fn db_error(error: sqlx::Error) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

fn cents_to_i64(cents: u64) -> Result<i64, StoreError> {
    i64::try_from(cents)
        .map_err(|_| StoreError::InvalidData(format!("amount overflows bigint: {cents}")))
}
