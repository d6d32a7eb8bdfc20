//! Time source used for throttling and cache expiry
//!
//! Production code uses [`SystemClock`]. [`ManualClock`] (feature
//! `test-support`) holds simulated time that only moves when advanced or
//! slept on, which keeps rate-limit and refresh tests deterministic.

use std::time::{Duration, Instant};

/// Monotonic time source with blocking sleep
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Block the calling thread until `deadline`
    fn sleep_until(&self, deadline: Instant);

    fn sleep_for(&self, duration: Duration) {
        let deadline = self.now() + duration;
        self.sleep_until(deadline);
    }
}

/// Real wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-support"))]
mod manual {
    use super::Clock;
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    /// Simulated time; sleeping advances the clock instead of blocking
    #[derive(Debug)]
    pub struct ManualClock {
        origin: Instant,
        now: Mutex<Instant>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            let origin = Instant::now();
            Self {
                origin,
                now: Mutex::new(origin),
            }
        }

        pub fn advance(&self, duration: Duration) {
            *self.now.lock() += duration;
        }

        /// Simulated time passed since creation
        pub fn elapsed(&self) -> Duration {
            *self.now.lock() - self.origin
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }

        fn sleep_until(&self, deadline: Instant) {
            let mut now = self.now.lock();
            if deadline > *now {
                *now = deadline;
            }
        }
    }
}
