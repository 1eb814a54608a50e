//! Injected dependencies for the engine.
//!
//! Time is the one ambient dependency the engine has; abstracting it behind
//! [`Clock`] keeps lease arithmetic deterministic under test.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
