//! Error taxonomy for the cart engine.
//!
//! Business-rule failures ([`CartError`]) are typed results the caller maps
//! to distinct user-facing responses; they are never thrown as generic
//! faults. Store failures ([`StoreError`]) are transient and retryable by
//! the caller; the engine performs no automatic retry itself.

use thiserror::Error;

/// Errors raised by inventory and order store implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or the operation failed transiently.
    /// Retryable by the caller.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store returned data the engine cannot interpret (malformed row,
    /// out-of-range value).
    #[error("invalid store data: {0}")]
    InvalidData(String),
}

/// Errors returned by the cart engine's external operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Cart absent, already expired, or the referenced item is not in the
    /// cart.
    #[error("cart or item not found")]
    NotFound,

    /// The requested product does not exist in the inventory store.
    #[error("product not found")]
    ProductNotFound,

    /// The cart belongs to a different user than the caller.
    #[error("cart belongs to another user")]
    Forbidden,

    /// The inventory store does not hold enough stock for the request.
    /// No mutation was performed.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        /// Units the caller asked to reserve.
        requested: u32,
        /// Units available at the time of the failed reservation.
        available: u32,
    },

    /// Checkout was attempted on a cart with no items.
    #[error("cart is empty")]
    EmptyCart,

    /// A store operation failed transiently; the operation may be retried.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reservation bookkeeping is inconsistent (e.g. releasing more than is
    /// reserved). Indicates a defect; never silently continued from.
    #[error("reservation bookkeeping violation: {0}")]
    InvariantViolation(String),
}
