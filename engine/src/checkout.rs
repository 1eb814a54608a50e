//! Converts a cart into a durable order inside a single transaction.
//!
//! The transaction writes the order header and one line per cart item, and
//! nothing else: the stock was already debited at reservation time and is
//! consumed by the sale, so no inventory is touched. A failed transaction
//! leaves no partial rows and the cart untouched, so checkout can simply be
//! retried while the cart is alive.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use storefront_core::error::CartError;
use storefront_core::orders::{OrderStore, OrderTransaction};
use storefront_core::types::{Cart, OrderHeader, OrderId, OrderLine, OrderStatus};

/// Writes committed orders to the order store.
pub struct CheckoutCoordinator {
    orders: Arc<dyn OrderStore>,
}

impl CheckoutCoordinator {
    /// Create a coordinator over the given order store.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Persist `cart` as an order placed at `placed_at` and return the new
    /// order id.
    ///
    /// The caller has already validated the cart (live, owned by the
    /// caller, non-empty) and holds its lock across this call, so the cart
    /// cannot change underneath the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the transaction fails; every insert
    /// is rolled back and the cart is left exactly as it was.
    pub async fn commit(&self, cart: &Cart, placed_at: DateTime<Utc>) -> Result<OrderId, CartError> {
        let header = OrderHeader {
            owner_id: cart.owner_id,
            placed_at,
            status: OrderStatus::Completed,
            total: cart.subtotal(),
        };

        let mut tx = self.orders.begin().await?;

        let order_id = match tx.insert_order(&header).await {
            Ok(order_id) => order_id,
            Err(error) => {
                rollback_quietly(tx).await;
                return Err(error.into());
            },
        };

        for item in &cart.items {
            let line = OrderLine {
                product_id: item.product_id,
                quantity: item.quantity_reserved,
                unit_price: item.unit_price,
            };
            if let Err(error) = tx.insert_line(order_id, &line).await {
                rollback_quietly(tx).await;
                return Err(error.into());
            }
        }

        tx.commit().await?;
        Ok(order_id)
    }
}

async fn rollback_quietly(tx: Box<dyn OrderTransaction>) {
    if let Err(error) = tx.rollback().await {
        tracing::warn!(error = %error, "order transaction rollback failed");
    }
}
