//! Single-flight tap guard.
//!
//! A tap is processed only when the guard is idle. After processing, the
//! guard stays closed for a hold period so a bouncing reader or a card held
//! against the reader does not sign the member in and straight back out.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardState {
    Idle,
    Processing,
    Holding { until: Instant },
}

#[derive(Debug, Clone)]
pub struct TapGuard {
    state: GuardState,
    hold: Duration,
}

impl TapGuard {
    pub fn new(hold: Duration) -> Self {
        Self {
            state: GuardState::Idle,
            hold,
        }
    }

    /// Claim the guard for one tap. Returns `false` if a tap is being
    /// processed or the hold period has not elapsed.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.is_busy(now) {
            return false;
        }
        self.state = GuardState::Processing;
        true
    }

    /// Finish processing; further taps are ignored until `now + hold`.
    pub fn release(&mut self, now: Instant) {
        self.state = if self.hold.is_zero() {
            GuardState::Idle
        } else {
            GuardState::Holding {
                until: now + self.hold,
            }
        };
    }

    /// Drop any hold immediately, e.g. when the screen changes.
    pub fn reset(&mut self) {
        self.state = GuardState::Idle;
    }

    pub fn is_busy(&self, now: Instant) -> bool {
        match self.state {
            GuardState::Idle => false,
            GuardState::Processing => true,
            GuardState::Holding { until } => now < until,
        }
    }
}
