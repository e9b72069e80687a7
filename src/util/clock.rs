//! Injectable monotonic time source.
//!
//! Every time read in the simulation flows through `Clock` so that tests can
//! drive the clock by hand. Timestamps are durations since clock construction.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Monotonic time source for the simulation core.
pub trait Clock: Send + Sync {
    /// Elapsed time since the clock was constructed.
    fn now(&self) -> Duration;

    /// Time elapsed since `t`. Saturates to zero for future timestamps.
    fn since(&self, t: Duration) -> Duration {
        self.now().saturating_sub(t)
    }
}

/// Real clock backed by `std::time::Instant`.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Manually advanced clock for deterministic tests.
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Convenience for millisecond-granularity tests.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Set the clock to an absolute value.
    pub fn set(&self, to: Duration) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(50));
        assert_eq!(clock.now(), Duration::from_millis(50));
        clock.advance_ms(150);
        assert_eq!(clock.now(), Duration::from_millis(200));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(5));
        assert_eq!(clock.now(), Duration::from_secs(5));
    }

    #[test]
    fn test_since() {
        let clock = ManualClock::new();
        clock.set(Duration::from_millis(300));
        assert_eq!(clock.since(Duration::from_millis(100)), Duration::from_millis(200));
    }

    #[test]
    fn test_since_future_saturates() {
        let clock = ManualClock::new();
        clock.set(Duration::from_millis(100));
        assert_eq!(clock.since(Duration::from_millis(300)), Duration::ZERO);
    }
}
