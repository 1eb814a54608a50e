//! Integration tests for the cart engine's external operations: reserve,
//! update, release, delete, and checkout against in-memory stores.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use storefront_core::environment::SystemClock;
use storefront_core::types::{CartId, Money, OwnerId, ProductId, ProductRecord};
use storefront_engine::{CartEngine, CartError, EngineConfig};
use storefront_testing::stores::{InMemoryInventoryStore, InMemoryOrderStore};

fn product(id: i64, price_cents: u64, available: u32) -> ProductRecord {
    ProductRecord {
        product_id: ProductId::new(id),
        name: format!("product-{id}"),
        unit_price: Money::from_cents(price_cents),
        image: None,
        available,
    }
}

fn engine_with(
    products: impl IntoIterator<Item = ProductRecord>,
) -> (CartEngine, Arc<InMemoryInventoryStore>, Arc<InMemoryOrderStore>) {
    let inventory = Arc::new(InMemoryInventoryStore::with_products(products));
    let orders = Arc::new(InMemoryOrderStore::new());
    let engine = CartEngine::start(
        EngineConfig::default(),
        inventory.clone(),
        orders.clone(),
        Arc::new(SystemClock),
    );
    (engine, inventory, orders)
}

#[tokio::test]
async fn new_cart_is_empty_with_a_full_lease() {
    let (engine, _inventory, _orders) = engine_with([product(1, 500, 5)]);
    let cart_id = engine.create_cart(OwnerId::new(1)).await;

    let snapshot = engine.get_cart(cart_id).await.unwrap();
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.owner_id, OwnerId::new(1));
    assert!(snapshot.remaining_seconds >= 599 && snapshot.remaining_seconds <= 600);
    assert_eq!(snapshot.subtotal, Money::ZERO);

    engine.shutdown();
}

#[tokio::test]
async fn an_owner_may_hold_several_carts() {
    let (engine, _inventory, _orders) = engine_with([product(1, 500, 5)]);
    let owner = OwnerId::new(1);

    let first = engine.create_cart(owner).await;
    let second = engine.create_cart(owner).await;

    assert_ne!(first, second);
    assert!(engine.get_cart(first).await.is_ok());
    assert!(engine.get_cart(second).await.is_ok());
    assert_eq!(engine.active_carts().await, 2);

    engine.shutdown();
}

#[tokio::test]
async fn adding_an_item_debits_stock_and_snapshots_the_price() {
    let (engine, inventory, _orders) = engine_with([product(1, 1250, 5)]);
    let cart_id = engine.create_cart(OwnerId::new(1)).await;

    engine.add_or_update_item(cart_id, ProductId::new(1), 3).await.unwrap();

    assert_eq!(inventory.available_of(ProductId::new(1)), Some(2));
    let snapshot = engine.get_cart(cart_id).await.unwrap();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].quantity_reserved, 3);
    assert_eq!(snapshot.items[0].unit_price, Money::from_cents(1250));
    assert_eq!(snapshot.items[0].name, "product-1");
    assert_eq!(snapshot.subtotal, Money::from_cents(3750));

    engine.shutdown();
}

#[tokio::test]
async fn updating_quantity_reserves_or_releases_the_difference() {
    let (engine, inventory, _orders) = engine_with([product(1, 500, 10)]);
    let cart_id = engine.create_cart(OwnerId::new(1)).await;
    let id = ProductId::new(1);

    engine.add_or_update_item(cart_id, id, 4).await.unwrap();
    assert_eq!(inventory.available_of(id), Some(6));

    engine.add_or_update_item(cart_id, id, 7).await.unwrap();
    assert_eq!(inventory.available_of(id), Some(3));

    engine.add_or_update_item(cart_id, id, 2).await.unwrap();
    assert_eq!(inventory.available_of(id), Some(8));

    engine.add_or_update_item(cart_id, id, 0).await.unwrap();
    assert_eq!(inventory.available_of(id), Some(10));
    assert!(engine.get_cart(cart_id).await.unwrap().items.is_empty());

    engine.shutdown();
}

#[tokio::test]
async fn removing_an_item_restores_availability() {
    let (engine, inventory, _orders) = engine_with([product(1, 500, 5)]);
    let cart_id = engine.create_cart(OwnerId::new(1)).await;
    let id = ProductId::new(1);

    engine.add_or_update_item(cart_id, id, 3).await.unwrap();
    engine.remove_item(cart_id, id).await.unwrap();

    assert_eq!(inventory.available_of(id), Some(5));
    assert!(engine.get_cart(cart_id).await.unwrap().items.is_empty());

    engine.shutdown();
}

#[tokio::test]
async fn removing_an_absent_item_reports_not_found() {
    let (engine, _inventory, _orders) = engine_with([product(1, 500, 5)]);
    let cart_id = engine.create_cart(OwnerId::new(1)).await;

    let err = engine.remove_item(cart_id, ProductId::new(1)).await.unwrap_err();
    assert_eq!(err, CartError::NotFound);

    engine.shutdown();
}

#[tokio::test]
async fn insufficient_stock_leaves_everything_untouched() {
    let (engine, inventory, _orders) = engine_with([product(1, 500, 5)]);
    let cart_id = engine.create_cart(OwnerId::new(1)).await;
    let id = ProductId::new(1);

    let err = engine.add_or_update_item(cart_id, id, 6).await.unwrap_err();
    assert_eq!(err, CartError::InsufficientStock { requested: 6, available: 5 });
    assert_eq!(inventory.available_of(id), Some(5));
    assert!(engine.get_cart(cart_id).await.unwrap().items.is_empty());

    engine.shutdown();
}

#[tokio::test]
async fn unknown_product_is_rejected() {
    let (engine, _inventory, _orders) = engine_with([product(1, 500, 5)]);
    let cart_id = engine.create_cart(OwnerId::new(1)).await;

    let err = engine.add_or_update_item(cart_id, ProductId::new(99), 1).await.unwrap_err();
    assert_eq!(err, CartError::ProductNotFound);

    engine.shutdown();
}

#[tokio::test]
async fn operations_on_an_unknown_cart_report_not_found() {
    let (engine, _inventory, _orders) = engine_with([product(1, 500, 5)]);
    let missing = CartId::new();

    assert_eq!(engine.get_cart(missing).await.unwrap_err(), CartError::NotFound);
    assert_eq!(
        engine.add_or_update_item(missing, ProductId::new(1), 1).await.unwrap_err(),
        CartError::NotFound
    );
    assert_eq!(engine.refresh_lease(missing).await.unwrap_err(), CartError::NotFound);

    engine.shutdown();
}

#[tokio::test]
async fn deleting_a_cart_releases_stock_and_is_idempotent() {
    let (engine, inventory, _orders) = engine_with([product(1, 500, 5), product(2, 300, 4)]);
    let cart_id = engine.create_cart(OwnerId::new(1)).await;

    engine.add_or_update_item(cart_id, ProductId::new(1), 3).await.unwrap();
    engine.add_or_update_item(cart_id, ProductId::new(2), 2).await.unwrap();

    engine.delete_cart(cart_id).await.unwrap();
    assert_eq!(inventory.available_of(ProductId::new(1)), Some(5));
    assert_eq!(inventory.available_of(ProductId::new(2)), Some(4));
    assert_eq!(engine.get_cart(cart_id).await.unwrap_err(), CartError::NotFound);

    // Deleting again must not double-release.
    engine.delete_cart(cart_id).await.unwrap();
    assert_eq!(inventory.available_of(ProductId::new(1)), Some(5));
    assert_eq!(inventory.available_of(ProductId::new(2)), Some(4));

    // Deleting a cart that never existed is also a no-op success.
    engine.delete_cart(CartId::new()).await.unwrap();

    engine.shutdown();
}

#[tokio::test]
async fn checkout_consumes_stock_without_crediting_it_back() {
    let (engine, inventory, orders) = engine_with([product(1, 1000, 5)]);
    let owner = OwnerId::new(7);
    let cart_id = engine.create_cart(owner).await;
    let id = ProductId::new(1);

    engine.add_or_update_item(cart_id, id, 3).await.unwrap();
    let order_id = engine.checkout(cart_id, owner).await.unwrap();

    // Stock stays debited: the reservation was consumed, not returned.
    assert_eq!(inventory.available_of(id), Some(2));
    assert_eq!(engine.get_cart(cart_id).await.unwrap_err(), CartError::NotFound);
    assert_eq!(engine.active_carts().await, 0);

    let order = orders.order(order_id).unwrap();
    assert_eq!(order.header.owner_id, owner);
    assert_eq!(order.header.total, Money::from_cents(3000));
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].product_id, id);
    assert_eq!(order.lines[0].quantity, 3);
    assert_eq!(order.lines[0].unit_price, Money::from_cents(1000));
    assert_eq!(orders.len(), 1);

    engine.shutdown();
}

#[tokio::test]
async fn checkout_precondition_failures_have_no_side_effects() {
    let (engine, inventory, orders) = engine_with([product(1, 500, 5)]);
    let owner = OwnerId::new(1);
    let cart_id = engine.create_cart(owner).await;

    // Empty cart.
    assert_eq!(engine.checkout(cart_id, owner).await.unwrap_err(), CartError::EmptyCart);

    // Ownership mismatch.
    engine.add_or_update_item(cart_id, ProductId::new(1), 2).await.unwrap();
    assert_eq!(
        engine.checkout(cart_id, OwnerId::new(2)).await.unwrap_err(),
        CartError::Forbidden
    );

    // Unknown cart.
    assert_eq!(
        engine.checkout(CartId::new(), owner).await.unwrap_err(),
        CartError::NotFound
    );

    // Nothing was written or released.
    assert!(orders.is_empty());
    assert_eq!(inventory.available_of(ProductId::new(1)), Some(3));
    assert!(engine.get_cart(cart_id).await.is_ok());

    engine.shutdown();
}

#[tokio::test]
async fn failed_checkout_leaves_the_cart_reservable_for_retry() {
    let (engine, inventory, orders) = engine_with([product(1, 500, 5)]);
    let owner = OwnerId::new(1);
    let cart_id = engine.create_cart(owner).await;
    let id = ProductId::new(1);

    engine.add_or_update_item(cart_id, id, 2).await.unwrap();

    orders.set_fail_commits(true);
    let err = engine.checkout(cart_id, owner).await.unwrap_err();
    assert!(matches!(err, CartError::Store(_)));

    // Cart intact, stock still reserved, nothing persisted.
    assert!(orders.is_empty());
    assert_eq!(inventory.available_of(id), Some(3));
    let snapshot = engine.get_cart(cart_id).await.unwrap();
    assert_eq!(snapshot.items.len(), 1);

    // Retry succeeds once the store recovers.
    orders.set_fail_commits(false);
    engine.checkout(cart_id, owner).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(inventory.available_of(id), Some(3));

    engine.shutdown();
}

/// The worked scenario: stock 5, cart A reserves 3, cart B fails to
/// reserve 3, A checks out, B then succeeds with 2.
#[tokio::test]
async fn contended_product_scenario() {
    let (engine, inventory, orders) = engine_with([product(1, 800, 5)]);
    let id = ProductId::new(1);
    let owner_a = OwnerId::new(1);
    let owner_b = OwnerId::new(2);

    let cart_a = engine.create_cart(owner_a).await;
    let cart_b = engine.create_cart(owner_b).await;

    engine.add_or_update_item(cart_a, id, 3).await.unwrap();
    assert_eq!(inventory.available_of(id), Some(2));

    let err = engine.add_or_update_item(cart_b, id, 3).await.unwrap_err();
    assert_eq!(err, CartError::InsufficientStock { requested: 3, available: 2 });
    assert_eq!(inventory.available_of(id), Some(2));

    let order_id = engine.checkout(cart_a, owner_a).await.unwrap();
    let order = orders.order(order_id).unwrap();
    assert_eq!(order.lines[0].quantity, 3);
    assert_eq!(inventory.available_of(id), Some(2));

    engine.add_or_update_item(cart_b, id, 2).await.unwrap();
    assert_eq!(inventory.available_of(id), Some(0));

    engine.shutdown();
}

/// Conservation: available + reserved in live carts + sold always equals
/// the product's original stock.
#[tokio::test]
async fn stock_is_conserved_through_mixed_operations() {
    let (engine, inventory, orders) = engine_with([product(1, 500, 12)]);
    let id = ProductId::new(1);
    let owner = OwnerId::new(1);

    let cart_a = engine.create_cart(owner).await;
    let cart_b = engine.create_cart(OwnerId::new(2)).await;

    engine.add_or_update_item(cart_a, id, 5).await.unwrap();
    engine.add_or_update_item(cart_b, id, 4).await.unwrap();
    engine.add_or_update_item(cart_a, id, 2).await.unwrap();
    engine.checkout(cart_a, owner).await.unwrap();
    engine.delete_cart(cart_b).await.unwrap();

    let available = inventory.available_of(id).unwrap();
    let sold = orders.sold_of(id);
    assert_eq!(available + sold, 12);
    assert_eq!(sold, 2);

    engine.shutdown();
}
