//! In-memory implementations of the engine's store traits.
//!
//! Both stores guard their state with a single mutex, which makes the
//! check-then-debit pair naturally atomic, the same guarantee the
//! production stores get from a conditional `UPDATE`. Inspection helpers
//! and failure injection support the engine's integration tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use storefront_core::error::StoreError;
use storefront_core::inventory::InventoryStore;
use storefront_core::orders::{OrderStore, OrderTransaction};
use storefront_core::types::{OrderHeader, OrderId, OrderLine, ProductId, ProductRecord};

/// A committed order as recorded by [`InMemoryOrderStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedOrder {
    /// Allocated order id.
    pub id: OrderId,
    /// Order header.
    pub header: OrderHeader,
    /// Order lines in insertion order.
    pub lines: Vec<OrderLine>,
}

/// In-memory inventory store: a mutex-guarded product map.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    products: Mutex<HashMap<ProductId, ProductRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryInventoryStore {
    /// Create a new empty inventory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `products`.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = ProductRecord>) -> Self {
        let store = Self::new();
        for product in products {
            store.insert_product(product);
        }
        store
    }

    /// Insert or replace a product record.
    pub fn insert_product(&self, product: ProductRecord) {
        self.lock_products().insert(product.product_id, product);
    }

    /// Remove a product entirely (for exercising unknown-product paths).
    pub fn remove_product(&self, product_id: ProductId) {
        self.lock_products().remove(&product_id);
    }

    /// Current available quantity, for assertions in tests.
    #[must_use]
    pub fn available_of(&self, product_id: ProductId) -> Option<u32> {
        self.lock_products().get(&product_id).map(|p| p.available)
    }

    /// When `true`, every store operation fails with
    /// [`StoreError::Unavailable`] until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".into()));
        }
        Ok(())
    }

    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    fn lock_products(&self) -> MutexGuard<'_, HashMap<ProductId, ProductRecord>> {
        self.products.lock().unwrap()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn product(&self, product_id: ProductId) -> Result<Option<ProductRecord>, StoreError> {
        self.check_reachable()?;
        Ok(self.lock_products().get(&product_id).cloned())
    }

    async fn available(&self, product_id: ProductId) -> Result<Option<u32>, StoreError> {
        self.check_reachable()?;
        Ok(self.available_of(product_id))
    }

    async fn try_debit(&self, product_id: ProductId, quantity: u32) -> Result<bool, StoreError> {
        self.check_reachable()?;
        let mut products = self.lock_products();
        let Some(product) = products.get_mut(&product_id) else {
            return Ok(false);
        };
        if product.available < quantity {
            return Ok(false);
        }
        product.available -= quantity;
        Ok(true)
    }

    async fn credit(&self, product_id: ProductId, quantity: u32) -> Result<(), StoreError> {
        self.check_reachable()?;
        let mut products = self.lock_products();
        let Some(product) = products.get_mut(&product_id) else {
            return Err(StoreError::InvalidData(format!(
                "credit of {quantity} for unknown product {product_id}"
            )));
        };
        product.available = product.available.saturating_add(quantity);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct OrderStoreState {
    orders: Mutex<Vec<PersistedOrder>>,
    next_id: AtomicI64,
    fail_commits: AtomicBool,
}

impl OrderStoreState {
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    fn lock_orders(&self) -> MutexGuard<'_, Vec<PersistedOrder>> {
        self.orders.lock().unwrap()
    }
}

/// In-memory order store with buffered transactions.
///
/// Inserts are staged inside the transaction and only become visible on
/// [`OrderTransaction::commit`]; rollback (or drop) discards them, matching
/// the all-or-nothing contract of the production store.
#[derive(Clone, Debug, Default)]
pub struct InMemoryOrderStore {
    state: Arc<OrderStoreState>,
}

impl InMemoryOrderStore {
    /// Create a new empty order store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All committed orders, oldest first.
    #[must_use]
    pub fn orders(&self) -> Vec<PersistedOrder> {
        self.state.lock_orders().clone()
    }

    /// Look up a committed order by id.
    #[must_use]
    pub fn order(&self, order_id: OrderId) -> Option<PersistedOrder> {
        self.state.lock_orders().iter().find(|o| o.id == order_id).cloned()
    }

    /// Number of committed orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock_orders().len()
    }

    /// Whether no order has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock_orders().is_empty()
    }

    /// Total quantity of `product_id` across all committed order lines.
    #[must_use]
    pub fn sold_of(&self, product_id: ProductId) -> u32 {
        self.state
            .lock_orders()
            .iter()
            .flat_map(|o| o.lines.iter())
            .filter(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }

    /// When `true`, every commit fails with [`StoreError::Unavailable`]
    /// until switched back. Staged inserts are discarded, as a real
    /// transaction abort would.
    pub fn set_fail_commits(&self, fail: bool) {
        self.state.fail_commits.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, StoreError> {
        Ok(Box::new(InMemoryOrderTransaction {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
        }))
    }
}

struct InMemoryOrderTransaction {
    state: Arc<OrderStoreState>,
    staged: Vec<PersistedOrder>,
}

#[async_trait]
impl OrderTransaction for InMemoryOrderTransaction {
    async fn insert_order(&mut self, header: &OrderHeader) -> Result<OrderId, StoreError> {
        let id = OrderId::new(self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.staged.push(PersistedOrder { id, header: header.clone(), lines: Vec::new() });
        Ok(id)
    }

    async fn insert_line(&mut self, order_id: OrderId, line: &OrderLine) -> Result<(), StoreError> {
        let Some(order) = self.staged.iter_mut().find(|o| o.id == order_id) else {
            return Err(StoreError::InvalidData(format!(
                "order {order_id} is not part of this transaction"
            )));
        };
        order.lines.push(line.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.state.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }
        self.state.lock_orders().extend(self.staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;
    use chrono::Utc;
    use storefront_core::types::{Money, OrderStatus, OwnerId};

    fn product(id: i64, available: u32) -> ProductRecord {
        ProductRecord {
            product_id: ProductId::new(id),
            name: format!("product-{id}"),
            unit_price: Money::from_cents(500),
            image: None,
            available,
        }
    }

    #[tokio::test]
    async fn debit_respects_the_floor() {
        let store = InMemoryInventoryStore::with_products([product(1, 3)]);
        let id = ProductId::new(1);

        assert!(store.try_debit(id, 2).await.unwrap());
        assert!(!store.try_debit(id, 2).await.unwrap());
        assert_eq!(store.available_of(id), Some(1));

        store.credit(id, 2).await.unwrap();
        assert_eq!(store.available_of(id), Some(3));
    }

    #[tokio::test]
    async fn debit_of_unknown_product_fails_without_error() {
        let store = InMemoryInventoryStore::new();
        assert!(!store.try_debit(ProductId::new(9), 1).await.unwrap());
        assert!(store.credit(ProductId::new(9), 1).await.is_err());
    }

    #[tokio::test]
    async fn injected_outage_surfaces_as_unavailable() {
        let store = InMemoryInventoryStore::with_products([product(1, 3)]);
        store.set_unavailable(true);
        assert!(matches!(
            store.try_debit(ProductId::new(1), 1).await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.try_debit(ProductId::new(1), 1).await.unwrap());
    }

    fn header() -> OrderHeader {
        OrderHeader {
            owner_id: OwnerId::new(7),
            placed_at: Utc::now(),
            status: OrderStatus::Completed,
            total: Money::from_cents(1000),
        }
    }

    fn line(product: i64, quantity: u32) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(product),
            quantity,
            unit_price: Money::from_cents(500),
        }
    }

    #[tokio::test]
    async fn commit_makes_staged_order_visible() {
        let store = InMemoryOrderStore::new();
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_order(&header()).await.unwrap();
        tx.insert_line(id, &line(1, 2)).await.unwrap();
        assert!(store.is_empty());

        tx.commit().await.unwrap();
        let persisted = store.order(id).unwrap();
        assert_eq!(persisted.lines, vec![line(1, 2)]);
        assert_eq!(store.sold_of(ProductId::new(1)), 2);
    }

    #[tokio::test]
    async fn rollback_discards_staged_order() {
        let store = InMemoryOrderStore::new();
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_order(&header()).await.unwrap();
        tx.insert_line(id, &line(1, 2)).await.unwrap();
        tx.rollback().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failed_commit_leaves_store_unchanged() {
        let store = InMemoryOrderStore::new();
        store.set_fail_commits(true);
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_order(&header()).await.unwrap();
        tx.insert_line(id, &line(1, 2)).await.unwrap();
        assert!(tx.commit().await.is_err());
        assert!(store.is_empty());

        store.set_fail_commits(false);
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_order(&header()).await.unwrap();
        tx.insert_line(id, &line(1, 2)).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
