//! # Storefront Engine
//!
//! The cart reservation and checkout engine: per-user shopping carts with
//! time-limited stock reservation, automatic expiration, and atomic
//! conversion into durable orders.
//!
//! ## Components
//!
//! - [`registry::CartRegistry`] - in-memory table of active carts, one
//!   async mutex per cart so same-cart operations serialize while different
//!   carts proceed concurrently
//! - [`reservation::ReservationManager`] - debits and credits the
//!   inventory store; the check-then-debit pair is a single atomic store
//!   operation, so stock can never be oversold
//! - [`expiry::ExpirationScheduler`] - one timer per cart plus a periodic
//!   sweep backstop; lapsed carts release their reservations
//! - [`checkout::CheckoutCoordinator`] - writes one order per cart inside
//!   a single transaction, consuming (not returning) the reserved stock
//! - [`service::CartEngine`] - the facade tying the components together
//!   and exposing the external operations
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use storefront_core::environment::SystemClock;
//! use storefront_engine::{CartEngine, EngineConfig};
//!
//! let engine = CartEngine::start(
//!     EngineConfig::from_env(),
//!     inventory,  // Arc<dyn InventoryStore>
//!     orders,     // Arc<dyn OrderStore>
//!     Arc::new(SystemClock),
//! );
//!
//! let cart_id = engine.create_cart(owner).await;
//! engine.add_or_update_item(cart_id, product, 3).await?;
//! let order_id = engine.checkout(cart_id, owner).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod expiry;
pub mod registry;
pub mod reservation;
pub mod service;

pub use config::EngineConfig;
pub use service::CartEngine;
pub use storefront_core::error::{CartError, StoreError};
