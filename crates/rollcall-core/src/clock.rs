//! Wall-clock abstraction.
//!
//! Sign-in windows and the sleep schedule are evaluated in local time, while
//! the store keeps UTC timestamps. Controllers take `now` as a parameter; the
//! kiosk loop reads it from a [`Clock`] so tests can pin the time of day.

use chrono::{DateTime, Duration, FixedOffset, Local};
use std::sync::{Arc, Mutex};

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Current time with the local UTC offset attached.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The system clock in the machine's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A manually driven clock for tests and replays.
///
/// Clones share the same time, so a test can keep one handle and advance
/// the clock seen by the kiosk.
///
/// ```
/// use chrono::{DateTime, Duration};
/// use rollcall_core::{Clock, FixedClock};
///
/// let start = DateTime::parse_from_rfc3339("2025-03-03T09:00:00-05:00").unwrap();
/// let clock = FixedClock::new(start);
/// clock.advance(Duration::minutes(90));
/// assert_eq!(clock.now().to_rfc3339(), "2025-03-03T10:30:00-05:00");
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.lock() = now;
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<FixedOffset>> {
        // a poisoned clock still holds a valid timestamp
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn test_fixed_clock_shared_between_clones() {
        let clock = FixedClock::new(at("2025-03-03T09:00:00+00:00"));
        let other = clock.clone();

        clock.set(at("2025-03-03T11:30:00+00:00"));
        assert_eq!(other.now().hour(), 11);
        assert_eq!(other.now().minute(), 30);
    }

    #[test]
    fn test_fixed_clock_keeps_offset() {
        let clock = FixedClock::new(at("2025-03-03T09:00:00-05:00"));
        let now = clock.now();

        assert_eq!(now.hour(), 9);
        assert_eq!(now.with_timezone(&Utc).hour(), 14);
    }

    #[test]
    fn test_system_clock_close_to_utc_now() {
        let now = SystemClock.now().with_timezone(&Utc);
        let delta = (Utc::now() - now).num_seconds().abs();
        assert!(delta < 5);
    }
}
