//! `PostgreSQL` store implementations for the storefront cart engine.
//!
//! This crate provides the production implementations of the engine's
//! store traits:
//!
//! - [`PgInventoryStore`] - per-product available quantity, with the
//!   check-then-debit pair expressed as a single conditional `UPDATE` so
//!   concurrent reservations can never oversell
//! - [`PgOrderStore`] - durable orders written inside one transaction
//! - [`reconcile_available`] - startup pass that recomputes availability
//!   from total stock and committed order lines, discarding reservations
//!   orphaned by a previous process exit
//!
//! # Example
//!
//! ```ignore
//! use storefront_postgres::{PgInventoryStore, PgOrderStore, PostgresConfig, reconcile_available};
//!
//! async fn bootstrap() -> Result<(), storefront_core::StoreError> {
//!     let pool = PostgresConfig::from_env().connect().await?;
//!     reconcile_available(&pool).await?;
//!     let inventory = PgInventoryStore::new(pool.clone());
//!     let orders = PgOrderStore::new(pool);
//!     Ok(())
//! }
//! ```

mod config;
mod inventory;
mod orders;
mod reconcile;

pub use config::PostgresConfig;
pub use inventory::PgInventoryStore;
pub use orders::PgOrderStore;
pub use reconcile::reconcile_available;

/// DDL for the `products`, `orders`, and `order_lines` tables.
pub const SCHEMA_SQL: &str = include_str!("../schema.sql");
