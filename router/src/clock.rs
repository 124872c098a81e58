//! Monotonic time source consumed by the ARP resolver.
//!
//! The router never reads wall-clock time.  Everything time-driven (cache
//! entry aging, request retransmit pacing) works on durations since an
//! arbitrary start, so tests drive the resolver with a [`ManualClock`]
//! instead of sleeping.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

/// A monotonic clock.  `now()` never decreases; second resolution is
/// adequate for every consumer in this crate.
pub trait Clock: Send + Sync {
    /// Duration since an arbitrary fixed start.
    fn now(&self) -> Duration;
}

/// A shared clock is still a clock; the router and its embedder commonly
/// hold the same one.
impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

// =============================================================================
// ManualClock
// =============================================================================

/// A clock advanced explicitly by the caller.
///
/// Used by tests and simulations to step through retransmit and expiry
/// schedules without real delays.
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading zero.
    pub const fn new() -> Self {
        Self {
            millis: AtomicU64::new(0),
        }
    }

    /// Advance the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.millis
            .fetch_add(delta.as_millis() as u64, Ordering::Relaxed);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::Relaxed))
    }
}

// =============================================================================
// SystemClock (std)
// =============================================================================

/// Monotonic clock backed by [`std::time::Instant`].
#[cfg(feature = "std")]
pub struct SystemClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// Create a clock whose zero is the moment of construction.
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}
