//! Per-provider request spacing.
//!
//! Each provider identity gets a slot timeline. A caller reserves the next
//! free slot (`max(now, last + spacing)`) while holding the lock and then
//! sleeps until it, so concurrent callers queue behind each other instead of
//! all reading the same stale "last request" time.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::types::QuoteSource;

/// Default minimum spacing between two calls to the same provider.
pub const DEFAULT_MIN_SPACING: Duration = Duration::from_millis(100);

/// Cooperative per-provider rate limiter.
///
/// Guarantees that no two acquisitions for the same provider are released
/// within `min_spacing` of each other, regardless of how many tasks call
/// [`RateLimiter::acquire`] concurrently.
#[derive(Debug)]
pub struct RateLimiter {
    min_spacing: Duration,
    /// Release time of the most recent reservation per provider.
    slots: Mutex<HashMap<QuoteSource, Instant>>,
}

impl RateLimiter {
    /// Create a rate limiter with the given minimum spacing.
    #[must_use]
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The configured minimum spacing.
    #[must_use]
    pub const fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Lock the slot map, recovering from poison.
    ///
    /// The map only holds instants, so a poisoned guard is still consistent.
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<QuoteSource, Instant>> {
        self.slots.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Reserve the next release slot for `provider`.
    fn reserve(&self, provider: QuoteSource) -> Instant {
        let now = Instant::now();
        let mut slots = self.lock_slots();
        let slot = match slots.get(&provider) {
            Some(last) => (*last + self.min_spacing).max(now),
            None => now,
        };
        slots.insert(provider, slot);
        slot
    }

    /// Wait until a call to `provider` is permitted.
    pub async fn acquire(&self, provider: QuoteSource) {
        let slot = self.reserve(provider);
        let now = Instant::now();
        if slot > now {
            debug!(provider = %provider, wait = ?(slot - now), "Rate limiting");
            sleep_until(slot).await;
        }
    }

    /// Forget the history of a provider.
    pub fn reset(&self, provider: QuoteSource) {
        self.lock_slots().remove(&provider);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SPACING)
    }
}
