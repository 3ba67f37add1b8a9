//! Strictly increasing creation timestamps.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Hands out `created_at` values for one backend instance.
///
/// Each call returns the current wall-clock time in microseconds, or one
/// microsecond past the previous value if the wall clock has not advanced
/// (or went backwards). Two records of the same backend therefore never share
/// a `created_at`, and submission order equals `created_at` order.
#[derive(Debug)]
pub struct MonotonicClock {
    last_micros: AtomicI64,
}

impl MonotonicClock {
    /// Creates a clock with no history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_micros: AtomicI64::new(i64::MIN),
        }
    }

    /// Creates a clock that never returns `latest` or anything before it.
    ///
    /// Durable backends seed their clock with the newest stored timestamp.
    #[must_use]
    pub fn resuming_after(latest: Option<DateTime<Utc>>) -> Self {
        let clock = Self::new();
        if let Some(ts) = latest {
            clock.observe(ts);
        }
        clock
    }

    /// Records an externally produced timestamp.
    pub fn observe(&self, ts: DateTime<Utc>) {
        self.last_micros
            .fetch_max(ts.timestamp_micros(), Ordering::AcqRel);
    }

    /// Returns the next timestamp.
    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut prev = self.last_micros.load(Ordering::Acquire);
        loop {
            let next = wall.max(prev.saturating_add(1));
            match self.last_micros.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_default(),
                Err(actual) => prev = actual,
            }
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
