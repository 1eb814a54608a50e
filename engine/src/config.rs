//! Configuration for the cart engine.
//!
//! Loads from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Cart lease duration if `CART_LEASE_SECS` is unset: 10 minutes.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(600);

/// Sweep interval if `CART_SWEEP_INTERVAL_SECS` is unset: 5 minutes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a cart's reservations stay valid without a mutation or an
    /// explicit refresh. Every mutation renews the lease.
    pub lease: Duration,
    /// Interval between expiration sweeps, the backstop for lost timers.
    pub sweep_interval: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables
    /// (`CART_LEASE_SECS`, `CART_SWEEP_INTERVAL_SECS`), falling back to
    /// the defaults for missing or unparseable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            lease: env::var("CART_LEASE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(DEFAULT_LEASE, Duration::from_secs),
            sweep_interval: env::var("CART_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(DEFAULT_SWEEP_INTERVAL, Duration::from_secs),
        }
    }

    /// The lease as a `chrono` duration for timestamp arithmetic.
    #[must_use]
    pub fn lease_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.lease).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { lease: DEFAULT_LEASE, sweep_interval: DEFAULT_SWEEP_INTERVAL }
    }
}
