//! Timestamps and clocks.
//!
//! Timestamps are microseconds since the UNIX epoch throughout the crate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" for staleness checks.
///
/// Injected so tests can drive time explicitly.
pub trait Clock: Send + Sync {
    /// Current time in microseconds since epoch.
    fn now_us(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicU64,
}

impl ManualClock {
    /// Create a clock starting at `now_us`.
    pub fn new(now_us: u64) -> Self {
        Self {
            now_us: AtomicU64::new(now_us),
        }
    }

    /// Set the current time.
    pub fn set(&self, now_us: u64) {
        self.now_us.store(now_us, Ordering::SeqCst);
    }

    /// Advance the current time.
    pub fn advance(&self, delta_us: u64) {
        self.now_us.fetch_add(delta_us, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }
}

/// Generic timestamp wrapper for any data type.
#[derive(Debug, Clone, PartialEq)]
pub struct Timestamped<T> {
    /// The wrapped data
    pub data: T,
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
}

impl<T> Timestamped<T> {
    /// Create a new timestamped value.
    #[inline]
    pub fn new(data: T, timestamp_us: u64) -> Self {
        Self { data, timestamp_us }
    }

    /// Age relative to `now_us` (zero for stamps in the future).
    #[inline]
    pub fn age_us(&self, now_us: u64) -> u64 {
        now_us.saturating_sub(self.timestamp_us)
    }

    /// Map the inner data while preserving timestamp.
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Timestamped<U> {
        Timestamped {
            data: f(self.data),
            timestamp_us: self.timestamp_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_us(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now_us(), 1_500);
        clock.set(10);
        assert_eq!(clock.now_us(), 10);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01 in microseconds
        assert!(SystemClock.now_us() > 1_577_836_800_000_000);
    }

    #[test]
    fn test_timestamped_age() {
        let ts = Timestamped::new(42i32, 1_000);
        assert_eq!(ts.age_us(1_500), 500);
        assert_eq!(ts.age_us(500), 0);

        let doubled = ts.map(|x| x * 2);
        assert_eq!(doubled.data, 84);
        assert_eq!(doubled.timestamp_us, 1_000);
    }
}
