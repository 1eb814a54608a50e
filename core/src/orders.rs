//! Order store abstraction.
//!
//! Checkout's only durable-write boundary. A checkout opens one
//! [`OrderTransaction`], inserts the header and every line, and commits;
//! either every row is written or none is. The transaction never touches
//! inventory: reserved stock is consumed by checkout, not returned.

use crate::error::StoreError;
use crate::types::{OrderHeader, OrderId, OrderLine};
use async_trait::async_trait;

/// Durable storage for committed orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Open an atomic transaction for writing one order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be reached.
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, StoreError>;
}

/// One in-flight order write. Dropping a transaction without calling
/// [`commit`](OrderTransaction::commit) discards it.
#[async_trait]
pub trait OrderTransaction: Send {
    /// Insert the order header and return the allocated order id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails; the transaction should
    /// then be rolled back.
    async fn insert_order(&mut self, header: &OrderHeader) -> Result<OrderId, StoreError>;

    /// Insert one order line belonging to `order_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails; the transaction should
    /// then be rolled back.
    async fn insert_line(&mut self, order_id: OrderId, line: &OrderLine) -> Result<(), StoreError>;

    /// Commit every insert atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails; nothing was written.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every insert.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store rejects the rollback; the
    /// transaction is abandoned either way.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
