//! `PostgreSQL`-backed inventory store.
//!
//! The check-then-debit pair is one conditional `UPDATE`: the row is only
//! touched when it still holds enough stock, so the floor check and the
//! debit are atomic with respect to every other reservation of the same
//! product, across all carts and processes.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use storefront_core::error::StoreError;
use storefront_core::inventory::InventoryStore;
use storefront_core::types::{Money, ProductId, ProductRecord};

/// Production inventory store over a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    /// Create a store with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn product(&self, product_id: ProductId) -> Result<Option<ProductRecord>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT id, name, unit_price_cents, image, available
            FROM products
            WHERE id = $1
            ",
        )
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(|row| row_to_product(&row)).transpose()
    }

    async fn available(&self, product_id: ProductId) -> Result<Option<u32>, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r"
            SELECT available
            FROM products
            WHERE id = $1
            ",
        )
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(|(available,)| to_quantity(available, "available")).transpose()
    }

    async fn try_debit(&self, product_id: ProductId, quantity: u32) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET available = available - $2
            WHERE id = $1 AND available >= $2
            ",
        )
        .bind(product_id.as_i64())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        let debited = result.rows_affected() == 1;
        if debited {
            metrics::counter!("inventory.debited").increment(u64::from(quantity));
            tracing::debug!(product_id = %product_id, quantity = quantity, "stock debited");
        }
        Ok(debited)
    }

    async fn credit(&self, product_id: ProductId, quantity: u32) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET available = available + $2
            WHERE id = $1
            ",
        )
        .bind(product_id.as_i64())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() != 1 {
            return Err(StoreError::InvalidData(format!(
                "credit of {quantity} for unknown product {product_id}"
            )));
        }
        metrics::counter!("inventory.credited").increment(u64::from(quantity));
        tracing::debug!(product_id = %product_id, quantity = quantity, "stock credited");
        Ok(())
    }
}

fn db_error(error: sqlx::Error) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

fn to_quantity(value: i64, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{column} out of range: {value}")))
}

fn to_price(value: i64) -> Result<Money, StoreError> {
    u64::try_from(value)
        .map(Money::from_cents)
        .map_err(|_| StoreError::InvalidData(format!("unit_price_cents out of range: {value}")))
}

fn row_to_product(row: &PgRow) -> Result<ProductRecord, StoreError> {
    let id: i64 = row.try_get("id").map_err(db_error)?;
    let name: String = row.try_get("name").map_err(db_error)?;
    let unit_price_cents: i64 = row.try_get("unit_price_cents").map_err(db_error)?;
    let image: Option<String> = row.try_get("image").map_err(db_error)?;
    let available: i64 = row.try_get("available").map_err(db_error)?;

    Ok(ProductRecord {
        product_id: ProductId::new(id),
        name,
        unit_price: to_price(unit_price_cents)?,
        image,
        available: to_quantity(available, "available")?,
    })
}
