//! Cart lease expiration: explicit per-cart timers plus a periodic sweep.
//!
//! Every cart gets its own timer task that fires at the lease deadline.
//! Renewing a lease cancels the pending timer and schedules a fresh one;
//! a stale timer that fires anyway is a no-op because the expiry path
//! re-checks the current `lease_expires_at` under the cart lock before
//! doing anything.
//!
//! The sweep is the correctness backstop: it scans every registered cart on
//! a fixed interval and force-expires the ones whose lease has lapsed, so a
//! lost or late timer cannot strand a reservation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use storefront_core::types::CartId;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tracing::debug;

/// Owns the per-cart timers and the sweep lifecycle.
#[derive(Debug)]
pub struct ExpirationScheduler {
    timers: Mutex<HashMap<CartId, AbortHandle>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ExpirationScheduler {
    /// Create a scheduler with no timers armed.
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { timers: Mutex::new(HashMap::new()), shutdown_tx }
    }

    /// Arm (or re-arm) the timer for `cart_id` to run `on_fire` after
    /// `delay`. A previously armed timer for the same cart is cancelled in
    /// the same step, so refresh is an atomic cancel-and-reschedule.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, cart_id: CartId, delay: Duration, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire.await;
        });
        if let Some(stale) = self.lock_timers().insert(cart_id, handle.abort_handle()) {
            stale.abort();
        }
    }

    /// Disarm the timer for `cart_id`, if one is armed.
    pub fn cancel(&self, cart_id: CartId) {
        if let Some(handle) = self.lock_timers().remove(&cart_id) {
            handle.abort();
        }
    }

    /// Run `sweep` every `interval` until [`shutdown`](Self::shutdown).
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_sweep<F, Fut>(&self, interval: Duration, mut sweep: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval's first tick completes immediately; skip it so the
            // first sweep happens one full interval after startup.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => sweep().await,
                    _ = shutdown_rx.recv() => {
                        debug!("expiration sweep stopped");
                        break;
                    },
                }
            }
        });
    }

    /// Stop the sweep and abort every armed timer.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        let mut timers = self.lock_timers();
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }

    /// Number of armed timers.
    #[must_use]
    pub fn armed(&self) -> usize {
        self.lock_timers().len()
    }

    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    fn lock_timers(&self) -> MutexGuard<'_, HashMap<CartId, AbortHandle>> {
        self.timers.lock().unwrap()
    }
}

impl Default for ExpirationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter_future(counter: &Arc<AtomicU32>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn armed_timer_fires_once() {
        let scheduler = ExpirationScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.schedule(CartId::new(), Duration::from_millis(20), counter_future(&fired));
        assert_eq!(scheduler.armed(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_disarms_a_pending_timer() {
        let scheduler = ExpirationScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let cart_id = CartId::new();

        scheduler.schedule(cart_id, Duration::from_millis(40), counter_future(&fired));
        scheduler.cancel(cart_id);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.armed(), 0);
    }

    #[tokio::test]
    async fn reschedule_replaces_the_pending_timer() {
        let scheduler = ExpirationScheduler::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let cart_id = CartId::new();

        scheduler.schedule(cart_id, Duration::from_millis(40), counter_future(&first));
        scheduler.schedule(cart_id, Duration::from_millis(80), counter_future(&second));
        assert_eq!(scheduler.armed(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sweep_runs_until_shutdown() {
        let scheduler = ExpirationScheduler::new();
        let sweeps = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&sweeps);
        scheduler.spawn_sweep(Duration::from_millis(20), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(110)).await;
        scheduler.shutdown();
        let after_shutdown = sweeps.load(Ordering::SeqCst);
        assert!(after_shutdown >= 2, "sweep should have ticked, saw {after_shutdown}");

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(sweeps.load(Ordering::SeqCst), after_shutdown);
    }
}
