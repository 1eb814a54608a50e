//! Domain types for the storefront cart engine.
//!
//! Value objects (ids, money), the cart and its items, and the order
//! records produced by checkout. Carts are in-memory entities owned by the
//! registry; orders are durable rows owned by the order store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a cart, generated at creation and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartId(Uuid);

impl CartId {
    /// Creates a new random `CartId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `CartId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CartId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the authenticated user that owns a cart or an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(i64);

impl OwnerId {
    /// Wrap a raw user id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a catalog product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(i64);

impl ProductId {
    /// Wrap a raw product id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a durable order, allocated by the order store at insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(i64);

impl OrderId {
    /// Wrap a raw order id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// A zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents.
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, saturating at `u64::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplies the amount by a quantity, saturating at `u64::MAX`.
    #[must_use]
    pub const fn saturating_mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Products
// ============================================================================

/// A product as read from the inventory store at reservation time.
///
/// Price and display fields are snapshotted into the cart item so mid-lease
/// catalog edits never change what the customer agreed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product id.
    pub product_id: ProductId,
    /// Display name.
    pub name: String,
    /// Current unit price.
    pub unit_price: Money,
    /// Optional display image reference.
    pub image: Option<String>,
    /// Quantity currently available (reservations already subtracted).
    pub available: u32,
}

// ============================================================================
// Carts
// ============================================================================

/// Lifecycle state of a cart.
///
/// Exactly one of {timer, sweep, explicit delete, checkout} moves a cart out
/// of `Active`; the transition happens under the cart lock and losers of the
/// race observe the non-`Active` state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartStatus {
    /// Cart is live and accepting mutations.
    Active,
    /// Lease lapsed or the cart was explicitly deleted; reservations were
    /// credited back to the inventory store.
    Expired,
    /// Cart was converted into an order; reservations were consumed.
    CheckedOut,
}

/// A single reserved product inside a cart.
///
/// `quantity_reserved` is always greater than zero; an item that reaches
/// zero is removed from the cart, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// The reserved product.
    pub product_id: ProductId,
    /// Units debited from the inventory store for this cart.
    pub quantity_reserved: u32,
    /// Unit price at reservation time; never re-read from the catalog.
    pub unit_price: Money,
    /// Display name captured at add time.
    pub name: String,
    /// Display image captured at add time.
    pub image: Option<String>,
}

impl CartItem {
    /// Price of this line: unit price times reserved quantity.
    #[must_use]
    pub const fn line_total(&self) -> Money {
        self.unit_price.saturating_mul(self.quantity_reserved)
    }
}

/// An active shopping cart holding time-limited stock reservations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cart {
    /// Opaque unique identifier, immutable after creation.
    pub id: CartId,
    /// The user that created the cart.
    pub owner_id: OwnerId,
    /// Reserved items in insertion order, unique per product.
    pub items: Vec<CartItem>,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
    /// When the lease lapses; recomputed on every mutation and refresh.
    pub lease_expires_at: DateTime<Utc>,
    /// Lifecycle state.
    pub status: CartStatus,
}

impl Cart {
    /// Create a new empty cart with a lease of `lease` from `now`.
    #[must_use]
    pub fn new(id: CartId, owner_id: OwnerId, now: DateTime<Utc>, lease: Duration) -> Self {
        Self {
            id,
            owner_id,
            items: Vec::new(),
            created_at: now,
            lease_expires_at: now + lease,
            status: CartStatus::Active,
        }
    }

    /// Look up an item by product id.
    #[must_use]
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Mutable item lookup by product id.
    pub fn item_mut(&mut self, product_id: ProductId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.product_id == product_id)
    }

    /// Whether the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the lease has lapsed as of `now`.
    ///
    /// A cart is valid through its exact expiry instant; it lapses strictly
    /// after `lease_expires_at`.
    #[must_use]
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        now > self.lease_expires_at
    }

    /// Reset the lease to `now + lease`.
    pub fn renew_lease(&mut self, now: DateTime<Utc>, lease: Duration) {
        self.lease_expires_at = now + lease;
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items
            .iter()
            .fold(Money::ZERO, |acc, item| acc.saturating_add(item.line_total()))
    }

    /// Read-only view of the cart as of `now`.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> CartSnapshot {
        let remaining = (self.lease_expires_at - now).num_seconds().max(0);
        CartSnapshot {
            cart_id: self.id,
            owner_id: self.owner_id,
            items: self.items.clone(),
            created_at: self.created_at,
            remaining_seconds: u64::try_from(remaining).unwrap_or(0),
            subtotal: self.subtotal(),
        }
    }
}

/// Read-only view of a cart returned to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Cart id.
    pub cart_id: CartId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Reserved items.
    pub items: Vec<CartItem>,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
    /// Whole seconds until the lease lapses, floored at zero.
    pub remaining_seconds: u64,
    /// Sum of all line totals.
    pub subtotal: Money,
}

// ============================================================================
// Orders
// ============================================================================

/// Status of a durable order. Orders are immutable once written except for
/// this field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Checkout committed; the reserved stock is sold.
    Completed,
    /// Order was cancelled after the fact.
    Cancelled,
}

impl OrderStatus {
    /// Convert status to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse status from its database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Header of a durable order, written once by checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeader {
    /// The user the order belongs to.
    pub owner_id: OwnerId,
    /// When checkout committed.
    pub placed_at: DateTime<Utc>,
    /// Order status.
    pub status: OrderStatus,
    /// Sum of all line totals at checkout time.
    pub total: Money,
}

/// One line of a durable order: a product, a quantity, and the price the
/// customer reserved at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The sold product.
    pub product_id: ProductId,
    /// Units sold.
    pub quantity: u32,
    /// Unit price snapshot from the cart item.
    pub unit_price: Money,
}
