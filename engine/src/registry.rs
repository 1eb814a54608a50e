//! In-memory table of active carts.
//!
//! The registry owns the map of live carts. Each cart sits behind its own
//! `tokio::sync::Mutex`, so mutations of one cart are strictly serialized
//! while operations on different carts never block each other. The outer
//! `RwLock` guards only the map itself and is never held across an await
//! into a cart lock or a store call.

use std::collections::HashMap;
use std::sync::Arc;
use storefront_core::types::{Cart, CartId};
use tokio::sync::{Mutex, RwLock};

/// Shared handle to one cart's state.
pub type CartSlot = Arc<Mutex<Cart>>;

/// Concurrent map of live carts keyed by cart id.
#[derive(Debug, Default)]
pub struct CartRegistry {
    carts: RwLock<HashMap<CartId, CartSlot>>,
}

impl CartRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly created cart and return its slot.
    pub async fn insert(&self, cart: Cart) -> CartSlot {
        let cart_id = cart.id;
        let slot = Arc::new(Mutex::new(cart));
        self.carts.write().await.insert(cart_id, Arc::clone(&slot));
        slot
    }

    /// Fetch the slot for `cart_id`, if the cart is still registered.
    pub async fn get(&self, cart_id: CartId) -> Option<CartSlot> {
        self.carts.read().await.get(&cart_id).cloned()
    }

    /// Purge `cart_id` from the registry. Returns the slot if it was still
    /// present, `None` if another transition already removed it.
    pub async fn remove(&self, cart_id: CartId) -> Option<CartSlot> {
        self.carts.write().await.remove(&cart_id)
    }

    /// Snapshot of every registered cart id, for the sweep.
    pub async fn ids(&self) -> Vec<CartId> {
        self.carts.read().await.keys().copied().collect()
    }

    /// Number of live carts.
    pub async fn len(&self) -> usize {
        self.carts.read().await.len()
    }

    /// Whether no cart is registered.
    pub async fn is_empty(&self) -> bool {
        self.carts.read().await.is_empty()
    }
}
