//! Monotonic clock capability
//!
//! **Purpose**: simulate mode ends emulated playback by comparing clock
//! readings against the run duration.
//!
//! Readings are microseconds relative to an anchor `Instant`, so they are:
//! - Monotonic (always increase)
//! - Unaffected by system clock changes (NTP, manual adjustments)
//! - Safe to store in `AtomicU64`

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of monotonic time in microseconds
pub trait Clock: Send + Sync {
    fn now_us(&self) -> u64;
}

/// Clock anchored to its own construction time
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.anchor.elapsed().as_micros() as u64
    }
}

/// Hand-driven clock
///
/// Starts at 0 and only moves when [`ManualClock::advance`] or
/// [`ManualClock::set`] is called.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta_us: u64) {
        self.now_us.fetch_add(delta_us, Ordering::Relaxed);
    }

    pub fn set(&self, now_us: u64) {
        self.now_us.store(now_us, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::Relaxed)
    }
}
