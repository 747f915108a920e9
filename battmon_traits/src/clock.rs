use chrono::{DateTime, Utc};
use std::thread;
use std::time::{Duration, Instant};

/// Clock abstraction shared by the estimator, the sampler and the watchdog.
///
/// - now(): monotonic Instant used for integration and settle timing
/// - wall(): wall-clock time used for persisted stamps and log rows
/// - sleep(): sleeps for the provided duration (implementations may simulate)
pub trait Clock {
    fn now(&self) -> Instant;
    fn wall(&self) -> DateTime<Utc>;
    fn sleep(&self, d: Duration);

    /// Wall-clock seconds since the unix epoch.
    fn unix_secs(&self) -> f64 {
        let w = self.wall();
        w.timestamp() as f64 + f64::from(w.timestamp_subsec_millis()) / 1000.0
    }
}

/// Default clock backed by std::time::Instant and the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic test clock whose time can be advanced manually.
    ///
    /// now() = origin + offset, wall() = wall_origin + offset.
    /// sleep(d) advances internal time by d without actually sleeping.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        wall_origin: DateTime<Utc>,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                wall_origin: Utc::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Advance by whole seconds.
        pub fn advance_secs(&self, secs: u64) {
            self.advance(Duration::from_secs(secs));
        }

        fn offset(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.offset()
        }

        fn wall(&self) -> DateTime<Utc> {
            let off = chrono::Duration::from_std(self.offset()).unwrap_or(chrono::Duration::zero());
            self.wall_origin + off
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn advancing_moves_both_clocks_together() {
            let clock = TestClock::new();
            let t0 = clock.now();
            let w0 = clock.wall();
            clock.advance_secs(30);
            assert_eq!(clock.now() - t0, Duration::from_secs(30));
            assert_eq!((clock.wall() - w0).num_seconds(), 30);
        }

        #[test]
        fn sleep_does_not_block() {
            let clock = TestClock::new();
            let t0 = clock.now();
            clock.sleep(Duration::from_secs(3600));
            assert_eq!(clock.now() - t0, Duration::from_secs(3600));
        }
    }
}
