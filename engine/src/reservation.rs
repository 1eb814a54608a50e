//! Reservation bookkeeping between carts and the inventory store.
//!
//! Reserving debits the store's available quantity immediately; releasing
//! credits it back. Because the store's debit is an atomic
//! decrement-with-floor, two carts racing for the last units of a product
//! cannot both win. Quantity updates are computed as signed deltas and
//! dispatched to reserve or release, so every path goes through the same
//! two primitives.
//!
//! Every method takes `&mut Cart`; the caller (the engine facade) holds the
//! cart's lock for the duration of the call.

use std::cmp::Ordering;
use std::sync::Arc;
use storefront_core::error::CartError;
use storefront_core::inventory::InventoryStore;
use storefront_core::types::{Cart, CartItem, ProductId};

/// Enforces the reservation invariant against the inventory store.
pub struct ReservationManager {
    inventory: Arc<dyn InventoryStore>,
}

impl ReservationManager {
    /// Create a manager over the given inventory store.
    #[must_use]
    pub fn new(inventory: Arc<dyn InventoryStore>) -> Self {
        Self { inventory }
    }

    /// Reserve `delta` more units of `product_id` into `cart`.
    ///
    /// On success the store's available quantity has been debited and the
    /// cart item's reserved quantity grown (the item is created if absent).
    /// On failure nothing was mutated anywhere.
    ///
    /// # Errors
    ///
    /// - [`CartError::ProductNotFound`] for an unknown product
    /// - [`CartError::InsufficientStock`] if fewer than `delta` units are
    ///   available
    /// - [`CartError::Store`] if the store cannot be reached
    pub async fn reserve(
        &self,
        cart: &mut Cart,
        product_id: ProductId,
        delta: u32,
    ) -> Result<(), CartError> {
        if delta == 0 {
            return Ok(());
        }

        // Snapshot price and display fields before touching stock. Only a
        // first reservation needs the record; later ones keep the original
        // snapshot.
        let record = if cart.item(product_id).is_some() {
            None
        } else {
            let record = self
                .inventory
                .product(product_id)
                .await?
                .ok_or(CartError::ProductNotFound)?;
            Some(record)
        };

        if !self.inventory.try_debit(product_id, delta).await? {
            metrics::counter!("cart.reservations.rejected").increment(1);
            return Err(match self.inventory.available(product_id).await? {
                None => CartError::ProductNotFound,
                Some(available) => CartError::InsufficientStock { requested: delta, available },
            });
        }

        match cart.item_mut(product_id) {
            Some(item) => item.quantity_reserved += delta,
            None => {
                let Some(record) = record else {
                    return Err(CartError::InvariantViolation(format!(
                        "no product snapshot for new item {product_id}"
                    )));
                };
                cart.items.push(CartItem {
                    product_id,
                    quantity_reserved: delta,
                    unit_price: record.unit_price,
                    name: record.name,
                    image: record.image,
                });
            },
        }

        metrics::counter!("cart.reservations.accepted").increment(1);
        tracing::debug!(
            cart_id = %cart.id,
            product_id = %product_id,
            delta = delta,
            "reserved stock"
        );
        Ok(())
    }

    /// Release `delta` reserved units of `product_id` from `cart` back to
    /// the store. An item whose quantity reaches zero is removed.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotFound`] if the cart holds no such item
    /// - [`CartError::InvariantViolation`] if `delta` exceeds the reserved
    ///   quantity; never silently clamped, so bookkeeping bugs surface
    ///   instead of leaking stock
    /// - [`CartError::Store`] if the store cannot be reached
    pub async fn release(
        &self,
        cart: &mut Cart,
        product_id: ProductId,
        delta: u32,
    ) -> Result<(), CartError> {
        if delta == 0 {
            return Ok(());
        }

        let Some(item) = cart.item(product_id) else {
            return Err(CartError::NotFound);
        };
        let reserved = item.quantity_reserved;
        if delta > reserved {
            tracing::error!(
                cart_id = %cart.id,
                product_id = %product_id,
                delta = delta,
                reserved = reserved,
                "attempted to release more than is reserved"
            );
            return Err(CartError::InvariantViolation(format!(
                "release of {delta} exceeds reserved {reserved} for product {product_id}"
            )));
        }

        self.inventory.credit(product_id, delta).await?;

        if delta == reserved {
            cart.items.retain(|i| i.product_id != product_id);
        } else if let Some(item) = cart.item_mut(product_id) {
            item.quantity_reserved = reserved - delta;
        }

        tracing::debug!(
            cart_id = %cart.id,
            product_id = %product_id,
            delta = delta,
            "released stock"
        );
        Ok(())
    }

    /// Set the reserved quantity of `product_id` to `new_quantity`,
    /// reserving or releasing the difference. An absent item with
    /// `new_quantity > 0` behaves as a fresh reserve; `new_quantity == 0`
    /// removes the item.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`reserve`](Self::reserve) and
    /// [`release`](Self::release).
    pub async fn set_quantity(
        &self,
        cart: &mut Cart,
        product_id: ProductId,
        new_quantity: u32,
    ) -> Result<(), CartError> {
        let current = cart.item(product_id).map_or(0, |i| i.quantity_reserved);
        match new_quantity.cmp(&current) {
            Ordering::Greater => self.reserve(cart, product_id, new_quantity - current).await,
            Ordering::Less => self.release(cart, product_id, current - new_quantity).await,
            Ordering::Equal => Ok(()),
        }
    }

    /// Release every reservation in `cart`, item by item.
    ///
    /// Each item is removed from the cart as soon as its credit lands, so a
    /// mid-way store failure can be retried without double-crediting.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if a credit fails; already-credited
    /// items are gone from the cart, the rest remain.
    pub async fn release_all(&self, cart: &mut Cart) -> Result<(), CartError> {
        while let Some((product_id, quantity)) =
            cart.items.first().map(|i| (i.product_id, i.quantity_reserved))
        {
            self.inventory.credit(product_id, quantity).await?;
            cart.items.retain(|i| i.product_id != product_id);
        }
        Ok(())
    }
}
