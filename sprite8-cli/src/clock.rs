//! Tick pacing.
use std::{thread, time::Duration, time::Instant};

use serde::Deserialize;

#[doc(hidden)]
pub const NANOS_IN_SECOND: u64 = 1_000_000_000;

/// Tick frequency, in hertz (per second)
///
/// Zero means the machine runs as fast as the host allows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Timer to synchronize thread with the software clock of the virtual CPU.
pub struct Clock {
    last: Instant,
    interval: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(freq: Hz) -> Self {
        Self {
            last: Instant::now(),
            interval: freq.into(),
        }
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.last = Instant::now()
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        if self.interval.is_zero() {
            return;
        }

        while self.last.elapsed() < self.interval {
            // Sleep does not have enough resolution at a few hundred hertz.
            //
            // Spinning a loop causes high CPU usage and fan madness.
            //
            // Yielding in a loop is the best alternative.
            thread::yield_now();
        }

        // Reset back to zero, rather than trying to catch up.
        self.reset();
    }
}
