//! Inventory store abstraction.
//!
//! The inventory store holds the authoritative per-product available
//! quantity. Reservations are modeled as debits: [`InventoryStore::try_debit`]
//! checks availability and subtracts in one atomic step, so a separate
//! read-then-write can never oversell under concurrent load.
//!
//! # Implementations
//!
//! - `PgInventoryStore` (in `storefront-postgres`): production, the floor
//!   check is a single conditional `UPDATE`
//! - `InMemoryInventoryStore` (in `storefront-testing`): deterministic tests

use crate::error::StoreError;
use crate::types::{ProductId, ProductRecord};
use async_trait::async_trait;

/// Authoritative per-product stock counts.
///
/// Implementations must be `Send + Sync`; the engine shares one instance
/// across all carts.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Full product record, used to snapshot price and display fields when
    /// an item first enters a cart. Returns `None` for unknown products.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be reached or returns
    /// malformed data.
    async fn product(&self, product_id: ProductId) -> Result<Option<ProductRecord>, StoreError>;

    /// Currently available quantity (reservations already subtracted).
    /// Returns `None` for unknown products.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be reached or returns
    /// malformed data.
    async fn available(&self, product_id: ProductId) -> Result<Option<u32>, StoreError>;

    /// Atomically debit `quantity` units if at least that many are
    /// available. Returns `false`, with no mutation, when stock is
    /// insufficient or the product is unknown.
    ///
    /// The check and the debit are one indivisible step with respect to
    /// every other concurrent debit of the same product.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be reached.
    async fn try_debit(&self, product_id: ProductId, quantity: u32) -> Result<bool, StoreError>;

    /// Credit `quantity` released units back to the product.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be reached, or
    /// [`StoreError::InvalidData`] if the product no longer exists (credited
    /// stock would otherwise vanish silently).
    async fn credit(&self, product_id: ProductId, quantity: u32) -> Result<(), StoreError>;
}
