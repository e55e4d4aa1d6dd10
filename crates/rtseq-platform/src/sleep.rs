//! High-precision sleep to an absolute deadline.

use std::time::{Duration, Instant};

/// Default busy-spin tail.
pub const DEFAULT_SPIN_TAIL: Duration = Duration::from_micros(80);

/// Sleeps to an absolute deadline: OS sleep for the bulk, busy-spin for the tail.
///
/// Sleeping to absolute deadlines (rather than for a fixed interval) keeps a
/// periodic loop free of cumulative drift: oversleeping one period shortens
/// the next instead of shifting every later wake-up.
#[derive(Debug, Clone, Copy)]
pub struct PreciseSleep {
    spin_tail: Duration,
}

impl PreciseSleep {
    /// Sleeper with the default spin tail.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            spin_tail: DEFAULT_SPIN_TAIL,
        }
    }

    /// Sleeper with a custom spin tail. Zero disables spinning.
    #[must_use]
    pub const fn with_spin_tail(spin_tail: Duration) -> Self {
        Self { spin_tail }
    }

    /// Configured spin tail.
    #[must_use]
    pub const fn spin_tail(&self) -> Duration {
        self.spin_tail
    }

    /// Block until `target`. Returns immediately when `target` has passed.
    ///
    /// Returns how late the wake-up was relative to `target`.
    pub fn sleep_until(&self, target: Instant) -> Duration {
        let now = Instant::now();
        if target <= now {
            return now.duration_since(target);
        }

        let remaining = target.duration_since(now);
        if remaining > self.spin_tail {
            std::thread::sleep(remaining.saturating_sub(self.spin_tail));
        }

        while Instant::now() < target {
            std::hint::spin_loop();
        }

        Instant::now().saturating_duration_since(target)
    }
}

impl Default for PreciseSleep {
    fn default() -> Self {
        Self::new()
    }
}
