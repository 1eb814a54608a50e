//! End-to-end walk through the cart engine against in-memory stores:
//! create a cart, reserve stock, watch a competing cart get rejected,
//! check out, and let an abandoned cart expire.
//!
//! Run with: `cargo run -p storefront-engine --example reserve_and_checkout`

use std::sync::Arc;
use std::time::Duration;
use storefront_core::environment::SystemClock;
use storefront_core::types::{Money, OwnerId, ProductId, ProductRecord};
use storefront_engine::{CartEngine, CartError, EngineConfig};
use storefront_testing::stores::{InMemoryInventoryStore, InMemoryOrderStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), CartError> {
    storefront_testing::init_logging();

    let inventory = Arc::new(InMemoryInventoryStore::with_products([ProductRecord {
        product_id: ProductId::new(1),
        name: "mechanical keyboard".to_string(),
        unit_price: Money::from_cents(12_900),
        image: None,
        available: 5,
    }]));
    let orders = Arc::new(InMemoryOrderStore::new());

    let engine = CartEngine::start(
        EngineConfig {
            lease: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(1),
        },
        inventory.clone(),
        orders.clone(),
        Arc::new(SystemClock),
    );

    let keyboard = ProductId::new(1);
    let alice = OwnerId::new(1);
    let bob = OwnerId::new(2);

    // Alice reserves three of the five keyboards.
    let alices_cart = engine.create_cart(alice).await;
    engine.add_or_update_item(alices_cart, keyboard, 3).await?;
    info!(available = ?inventory.available_of(keyboard), "after Alice's reservation");

    // Bob cannot get three; the stock Alice holds is invisible to him.
    let bobs_cart = engine.create_cart(bob).await;
    match engine.add_or_update_item(bobs_cart, keyboard, 3).await {
        Err(CartError::InsufficientStock { requested, available }) => {
            info!(requested, available, "Bob's reservation rejected");
        },
        other => info!(?other, "unexpected outcome for Bob"),
    }

    // Alice checks out: her reservation is consumed, not returned.
    let snapshot = engine.get_cart(alices_cart).await?;
    info!(subtotal = %snapshot.subtotal, seconds_left = snapshot.remaining_seconds, "Alice checks out");
    let order_id = engine.checkout(alices_cart, alice).await?;
    info!(
        order_id = %order_id,
        available = ?inventory.available_of(keyboard),
        "order placed; availability unchanged by checkout"
    );

    // Bob grabs the remaining two, then abandons his cart; the lease lapses
    // and his reservation flows back.
    engine.add_or_update_item(bobs_cart, keyboard, 2).await?;
    info!(available = ?inventory.available_of(keyboard), "after Bob's reservation");
    tokio::time::sleep(Duration::from_secs(3)).await;
    info!(
        available = ?inventory.available_of(keyboard),
        orders = orders.len(),
        "after Bob's cart expired"
    );

    engine.shutdown();
    Ok(())
}
