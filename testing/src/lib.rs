//! # Storefront Testing
//!
//! Testing utilities for the storefront cart engine:
//!
//! - Mock clocks ([`mocks::FixedClock`], [`mocks::ManualClock`]) for
//!   deterministic lease arithmetic
//! - In-memory store implementations ([`stores::InMemoryInventoryStore`],
//!   [`stores::InMemoryOrderStore`]) with inspection helpers and failure
//!   injection
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use storefront_engine::{CartEngine, EngineConfig};
//! use storefront_testing::stores::{InMemoryInventoryStore, InMemoryOrderStore};
//! use storefront_core::environment::SystemClock;
//!
//! #[tokio::test]
//! async fn test_reserve() {
//!     let inventory = Arc::new(InMemoryInventoryStore::new());
//!     let orders = Arc::new(InMemoryOrderStore::new());
//!     let engine = CartEngine::start(
//!         EngineConfig::default(),
//!         inventory.clone(),
//!         orders.clone(),
//!         Arc::new(SystemClock),
//!     );
//!     // ...
//! }
//! ```

pub mod stores;

/// Mock implementations of environment traits.
pub mod mocks {
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Mutex;
    use storefront_core::environment::Clock;

    /// Fixed clock for deterministic tests.
    ///
    /// Always returns the same time, making tests reproducible.
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when the test moves it.
    ///
    /// Useful for exercising lease expiry without real waits: schedule a
    /// cart, [`advance`](ManualClock::advance) past its lease, and let the
    /// sweep observe the lapse.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `start`.
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self { now: Mutex::new(start) }
        }

        /// Move the clock forward by `delta`.
        pub fn advance(&self, delta: Duration) {
            let mut now = self.lock_now();
            *now += delta;
        }

        /// Set the clock to an absolute instant.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.lock_now() = to;
        }

        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
        fn lock_now(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
            self.now.lock().unwrap()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.lock_now()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC).
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::UNIX_EPOCH + Duration::days(20_089))
    }
}

/// Initialize a compact tracing subscriber for test or demo output.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use stores::{InMemoryInventoryStore, InMemoryOrderStore, PersistedOrder};
