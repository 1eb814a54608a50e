//! The cart engine facade.
//!
//! Ties the registry, reservation manager, expiration scheduler, and
//! checkout coordinator together and exposes the engine's external
//! operations. Every operation on one cart runs under that cart's lock, so
//! same-cart mutations are strictly serialized; the per-product
//! check-then-debit is atomic at the store boundary, so nothing here needs
//! a cross-cart lock.
//!
//! Lifecycle transitions out of `Active` (expiry, deletion, checkout)
//! happen exactly once: the winner flips the status under the cart lock and
//! purges the cart; racing losers observe a non-`Active` status or a missing
//! registry entry and report `NotFound`.

use crate::checkout::CheckoutCoordinator;
use crate::config::EngineConfig;
use crate::expiry::ExpirationScheduler;
use crate::registry::CartRegistry;
use crate::reservation::ReservationManager;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};
use storefront_core::environment::Clock;
use storefront_core::error::CartError;
use storefront_core::inventory::InventoryStore;
use storefront_core::orders::OrderStore;
use storefront_core::types::{
    Cart, CartId, CartSnapshot, CartStatus, OrderId, OwnerId, ProductId,
};
use tracing::{info, warn};

/// The cart reservation and checkout engine.
///
/// Owns all engine state; cheap to share behind an `Arc`. Created with
/// [`CartEngine::start`] inside a tokio runtime (the expiration sweep and
/// per-cart timers are spawned onto it), stopped with
/// [`CartEngine::shutdown`].
pub struct CartEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    registry: CartRegistry,
    reservations: ReservationManager,
    checkout: CheckoutCoordinator,
    scheduler: ExpirationScheduler,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    /// Handle to ourselves for timer closures; timers must not keep the
    /// engine alive, so they hold weak references and no-op after shutdown.
    self_weak: Weak<EngineInner>,
}

impl CartEngine {
    /// Start the engine and its expiration sweep.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        config: EngineConfig,
        inventory: Arc<dyn InventoryStore>,
        orders: Arc<dyn OrderStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak| EngineInner {
            registry: CartRegistry::new(),
            reservations: ReservationManager::new(inventory),
            checkout: CheckoutCoordinator::new(orders),
            scheduler: ExpirationScheduler::new(),
            clock,
            config,
            self_weak: Weak::clone(weak),
        });

        let weak = Arc::downgrade(&inner);
        inner.scheduler.spawn_sweep(inner.config.sweep_interval, move || {
            let weak = Weak::clone(&weak);
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.sweep_once().await;
                }
            }
        });

        info!(
            lease_secs = inner.config.lease.as_secs(),
            sweep_interval_secs = inner.config.sweep_interval.as_secs(),
            "cart engine started"
        );
        Self { inner }
    }

    /// Stop the expiration sweep and abort every pending cart timer.
    ///
    /// Carts themselves are not released; a restarted process is expected
    /// to run the inventory reconciliation pass before taking traffic.
    pub fn shutdown(&self) {
        self.inner.scheduler.shutdown();
        info!("cart engine stopped");
    }

    /// Create a new empty cart for `owner_id` and return its id.
    ///
    /// The cart starts with a full lease and an armed expiration timer.
    /// An owner may hold any number of concurrent carts.
    pub async fn create_cart(&self, owner_id: OwnerId) -> CartId {
        let now = self.inner.clock.now();
        let cart = Cart::new(CartId::new(), owner_id, now, self.inner.config.lease_chrono());
        let cart_id = cart.id;

        self.inner.registry.insert(cart).await;
        self.inner.schedule_expiry_in(cart_id, self.inner.config.lease);

        metrics::counter!("cart.created").increment(1);
        info!(cart_id = %cart_id, owner_id = %owner_id, "cart created");
        cart_id
    }

    /// Read-only snapshot of a live cart: items, derived subtotal, and the
    /// remaining lease seconds.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if the cart is absent or its lease
    /// has lapsed.
    pub async fn get_cart(&self, cart_id: CartId) -> Result<CartSnapshot, CartError> {
        let slot = self.inner.registry.get(cart_id).await.ok_or(CartError::NotFound)?;
        let cart = slot.lock().await;
        let now = self.inner.clock.now();
        ensure_live(&cart, now)?;
        Ok(cart.snapshot(now))
    }

    /// Set the reserved quantity of `product_id` in the cart to `quantity`,
    /// reserving or releasing the difference against the inventory store.
    /// A quantity of zero removes the item. Success renews the lease.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotFound`] if the cart is absent or lapsed
    /// - [`CartError::ProductNotFound`] for an unknown product
    /// - [`CartError::InsufficientStock`] if the increase cannot be covered
    /// - [`CartError::Store`] if the inventory store cannot be reached
    pub async fn add_or_update_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        let slot = self.inner.registry.get(cart_id).await.ok_or(CartError::NotFound)?;
        let mut cart = slot.lock().await;
        ensure_live(&cart, self.inner.clock.now())?;

        self.inner.reservations.set_quantity(&mut cart, product_id, quantity).await?;
        self.inner.renew_lease(&mut cart);
        Ok(())
    }

    /// Remove `product_id` from the cart, releasing its full reserved
    /// quantity back to the inventory store. Success renews the lease.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotFound`] if the cart is absent, lapsed, or holds no
    ///   such item
    /// - [`CartError::Store`] if the inventory store cannot be reached
    pub async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), CartError> {
        let slot = self.inner.registry.get(cart_id).await.ok_or(CartError::NotFound)?;
        let mut cart = slot.lock().await;
        ensure_live(&cart, self.inner.clock.now())?;

        let reserved = cart.item(product_id).map(|i| i.quantity_reserved).ok_or(CartError::NotFound)?;
        self.inner.reservations.release(&mut cart, product_id, reserved).await?;
        self.inner.renew_lease(&mut cart);
        Ok(())
    }

    /// Reset the cart's lease to a full duration and re-arm its timer.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if the cart is absent or already
    /// lapsed.
    pub async fn refresh_lease(&self, cart_id: CartId) -> Result<(), CartError> {
        let slot = self.inner.registry.get(cart_id).await.ok_or(CartError::NotFound)?;
        let mut cart = slot.lock().await;
        ensure_live(&cart, self.inner.clock.now())?;

        self.inner.renew_lease(&mut cart);
        Ok(())
    }

    /// Delete the cart, releasing every reservation it holds. Deleting an
    /// absent (or already expired) cart is a no-op success.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the inventory store cannot be
    /// reached mid-release; the cart stays registered and the call can be
    /// retried.
    pub async fn delete_cart(&self, cart_id: CartId) -> Result<(), CartError> {
        let Some(slot) = self.inner.registry.get(cart_id).await else {
            return Ok(());
        };
        let mut cart = slot.lock().await;
        if cart.status != CartStatus::Active {
            return Ok(());
        }

        self.inner.reservations.release_all(&mut cart).await?;
        cart.status = CartStatus::Expired;
        self.inner.registry.remove(cart_id).await;
        self.inner.scheduler.cancel(cart_id);

        info!(cart_id = %cart_id, "cart deleted; reservations released");
        Ok(())
    }

    /// Convert the cart into a durable order.
    ///
    /// The order transaction is the only durable write; the reserved stock
    /// is consumed, not credited back. On success the cart is gone and the
    /// new order id is returned.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotFound`] if the cart is absent or lapsed
    /// - [`CartError::Forbidden`] if `owner_id` does not own the cart
    /// - [`CartError::EmptyCart`] if the cart holds no items
    /// - [`CartError::Store`] if the order transaction fails; the cart is
    ///   left intact and checkout can be retried
    pub async fn checkout(&self, cart_id: CartId, owner_id: OwnerId) -> Result<OrderId, CartError> {
        let slot = self.inner.registry.get(cart_id).await.ok_or(CartError::NotFound)?;
        let mut cart = slot.lock().await;
        let now = self.inner.clock.now();
        ensure_live(&cart, now)?;
        if cart.owner_id != owner_id {
            return Err(CartError::Forbidden);
        }
        if cart.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let order_id = match self.inner.checkout.commit(&cart, now).await {
            Ok(order_id) => order_id,
            Err(error) => {
                metrics::counter!("cart.checkouts.failed").increment(1);
                warn!(cart_id = %cart_id, error = %error, "checkout failed; cart left intact");
                return Err(error);
            },
        };

        cart.status = CartStatus::CheckedOut;
        self.inner.registry.remove(cart_id).await;
        self.inner.scheduler.cancel(cart_id);

        metrics::counter!("cart.checkouts.committed").increment(1);
        info!(
            cart_id = %cart_id,
            order_id = %order_id,
            owner_id = %owner_id,
            "cart checked out"
        );
        Ok(order_id)
    }

    /// Number of live carts, for observability and tests.
    pub async fn active_carts(&self) -> usize {
        self.inner.registry.len().await
    }
}

impl EngineInner {
    /// Arm (or re-arm) the expiration timer for `cart_id`.
    fn schedule_expiry_in(&self, cart_id: CartId, delay: std::time::Duration) {
        let weak = Weak::clone(&self.self_weak);
        self.scheduler.schedule(cart_id, delay, async move {
            if let Some(inner) = weak.upgrade() {
                inner.expire_if_due(cart_id).await;
            }
        });
    }

    /// Recompute the lease from now and re-arm the timer. Called under the
    /// cart lock after every successful mutation and on explicit refresh.
    fn renew_lease(&self, cart: &mut Cart) {
        let now = self.clock.now();
        cart.renew_lease(now, self.config.lease_chrono());
        self.schedule_expiry_in(cart.id, self.config.lease);
    }

    /// Expire `cart_id` if its lease has actually lapsed.
    ///
    /// Runs from the per-cart timer and from the sweep; both reduce to the
    /// same idempotent transition. A stale timer finds the lease renewed
    /// and re-arms itself for the remaining window instead.
    async fn expire_if_due(&self, cart_id: CartId) {
        let Some(slot) = self.registry.get(cart_id).await else {
            return;
        };
        let mut cart = slot.lock().await;
        if cart.status != CartStatus::Active {
            return;
        }

        let now = self.clock.now();
        if !cart.is_lapsed(now) {
            let remaining = (cart.lease_expires_at - now).to_std().unwrap_or_default();
            self.schedule_expiry_in(cart_id, remaining);
            return;
        }

        if let Err(error) = self.reservations.release_all(&mut cart).await {
            warn!(
                cart_id = %cart_id,
                error = %error,
                "could not release reservations of lapsed cart; sweep will retry"
            );
            return;
        }

        cart.status = CartStatus::Expired;
        self.registry.remove(cart_id).await;
        self.scheduler.cancel(cart_id);

        metrics::counter!("cart.expired").increment(1);
        info!(cart_id = %cart_id, "cart lease lapsed; reservations released");
    }

    /// One pass of the expiration backstop over every registered cart.
    async fn sweep_once(&self) {
        let cart_ids = self.registry.ids().await;
        tracing::debug!(carts = cart_ids.len(), "expiration sweep");
        for cart_id in cart_ids {
            self.expire_if_due(cart_id).await;
        }
    }
}

/// A cart is operable only while `Active` and within its lease.
fn ensure_live(cart: &Cart, now: DateTime<Utc>) -> Result<(), CartError> {
    if cart.status != CartStatus::Active || cart.is_lapsed(now) {
        return Err(CartError::NotFound);
    }
    Ok(())
}
