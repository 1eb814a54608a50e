//! # Storefront Core
//!
//! Core domain types and store abstractions for the cart reservation and
//! checkout engine.
//!
//! This crate defines everything the engine and its collaborators share:
//!
//! - **Domain types**: carts, cart items, orders, money, and id newtypes
//! - **Error taxonomy**: [`error::CartError`] for business-rule failures,
//!   [`error::StoreError`] for transient store failures
//! - **Store traits**: [`inventory::InventoryStore`] and
//!   [`orders::OrderStore`], implemented by `storefront-postgres` in
//!   production and `storefront-testing` for deterministic tests
//! - **Environment**: the [`environment::Clock`] trait so time is injected,
//!   never ambient
//!
//! The crate performs no I/O itself. Reservation is modeled as a *debit*
//! against the inventory store's available quantity rather than a separate
//! counter: once a cart holds a reservation, no other cart can see that
//! stock. See `storefront-engine` for the components that enforce this.

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod environment;
pub mod error;
pub mod inventory;
pub mod orders;
pub mod types;

pub use error::{CartError, StoreError};
pub use types::{
    Cart, CartId, CartItem, CartSnapshot, CartStatus, Money, OrderHeader, OrderId, OrderLine,
    OrderStatus, OwnerId, ProductId, ProductRecord,
};
