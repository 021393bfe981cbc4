use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" for expiry decisions.
///
/// Session liveness (`expiry > now`) and sweep thresholds all read time
/// through this trait so tests can step the clock instead of sleeping.
pub trait Clock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Manually stepped clock. Starts at a fixed instant and only moves
/// when told to — the TTL scenarios in the test suite depend on that.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_on_demand() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        assert_eq!(clock.now(), 100);

        clock.advance(15);
        assert_eq!(clock.now(), 115);

        clock.set(0);
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn system_clock_is_sane() {
        // Past 2020-01-01, i.e. not zero, not negative.
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
