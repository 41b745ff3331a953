//! Kiosk screen mode state machine.
//!
//! The kiosk is always in exactly one mode, which decides what a card tap
//! means:
//! - `Attendance`: a tap signs the member in or out
//! - `Registration`: a tap selects the card to bind to a position
//! - `HoursCheck`: a tap shows the member's hours for the current week
//! - `Asleep`: outside operating hours; taps are ignored
//!
//! # Valid Transitions
//!
//! - Attendance ↔ Registration
//! - Attendance ↔ HoursCheck
//! - Attendance / Registration / HoursCheck → Asleep
//! - Asleep → Attendance
//!
//! Secondary screens are closed when the kiosk falls asleep, so waking
//! always returns to attendance.
//!
//! # Examples
//!
//! ```
//! use rollcall_kiosk::{KioskMode, ModeMachine};
//!
//! let mut machine = ModeMachine::new();
//! assert_eq!(machine.current(), KioskMode::Attendance);
//!
//! machine.transition_to(KioskMode::Registration).unwrap();
//! assert!(machine.transition_to(KioskMode::HoursCheck).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use rollcall_core::{Error, Result};

/// Maximum number of mode transitions kept in history.
const MAX_HISTORY_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KioskMode {
    /// Normal operation: taps sign members in and out.
    Attendance,

    /// Binding a card to a position.
    Registration,

    /// Showing weekly hours for a tapped card.
    HoursCheck,

    /// Outside operating hours.
    Asleep,
}

impl fmt::Display for KioskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            KioskMode::Attendance => "Attendance",
            KioskMode::Registration => "Registration",
            KioskMode::HoursCheck => "HoursCheck",
            KioskMode::Asleep => "Asleep",
        };
        write!(f, "{mode}")
    }
}

impl KioskMode {
    /// Check if switching to `target` is allowed from this mode.
    ///
    /// ```
    /// use rollcall_kiosk::KioskMode;
    ///
    /// assert!(KioskMode::Attendance.can_transition_to(&KioskMode::Registration));
    /// assert!(!KioskMode::Asleep.can_transition_to(&KioskMode::HoursCheck));
    /// ```
    pub fn can_transition_to(&self, target: &KioskMode) -> bool {
        matches!(
            (self, target),
            (
                KioskMode::Attendance,
                KioskMode::Registration | KioskMode::HoursCheck | KioskMode::Asleep
            ) | (
                KioskMode::Registration | KioskMode::HoursCheck,
                KioskMode::Attendance | KioskMode::Asleep
            ) | (KioskMode::Asleep, KioskMode::Attendance)
        )
    }

    /// Whether the reader should be polling in this mode.
    pub fn reads_cards(&self) -> bool {
        !matches!(self, KioskMode::Asleep)
    }
}

/// A single recorded mode switch.
#[derive(Debug, Clone)]
pub struct ModeTransition {
    pub from: KioskMode,
    pub to: KioskMode,
    pub timestamp: Instant,
}

impl ModeTransition {
    pub fn new(from: KioskMode, to: KioskMode) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Tracks the current mode and validates switches.
///
/// Not synchronized; the kiosk loop owns it.
#[derive(Debug)]
pub struct ModeMachine {
    current: KioskMode,
    entered_at: Instant,
    history: VecDeque<ModeTransition>,
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeMachine {
    /// A machine in attendance mode.
    pub fn new() -> Self {
        Self::starting_in(KioskMode::Attendance)
    }

    /// A machine in `mode`, e.g. `Asleep` when the kiosk boots at night.
    pub fn starting_in(mode: KioskMode) -> Self {
        Self {
            current: mode,
            entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current(&self) -> KioskMode {
        self.current
    }

    pub fn is(&self, mode: KioskMode) -> bool {
        self.current == mode
    }

    pub fn time_in_current_mode(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<ModeTransition> {
        &self.history
    }

    /// Switch to `mode`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the switch is not allowed
    /// from the current mode. The machine is left unchanged.
    pub fn transition_to(&mut self, mode: KioskMode) -> Result<ModeTransition> {
        if !self.current.can_transition_to(&mode) {
            return Err(Error::InvalidStateTransition {
                from: self.current.to_string(),
                to: mode.to_string(),
            });
        }

        let transition = ModeTransition::new(self.current, mode);
        self.current = mode;
        self.entered_at = transition.timestamp;

        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(transition.clone());

        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_new_machine_starts_in_attendance() {
        let machine = ModeMachine::new();
        assert_eq!(machine.current(), KioskMode::Attendance);
        assert!(machine.history().is_empty());
    }

    #[rstest]
    #[case(KioskMode::Attendance, KioskMode::Registration)]
    #[case(KioskMode::Attendance, KioskMode::HoursCheck)]
    #[case(KioskMode::Attendance, KioskMode::Asleep)]
    #[case(KioskMode::Registration, KioskMode::Attendance)]
    #[case(KioskMode::Registration, KioskMode::Asleep)]
    #[case(KioskMode::HoursCheck, KioskMode::Attendance)]
    #[case(KioskMode::HoursCheck, KioskMode::Asleep)]
    #[case(KioskMode::Asleep, KioskMode::Attendance)]
    fn test_valid_transitions(#[case] from: KioskMode, #[case] to: KioskMode) {
        let mut machine = ModeMachine::starting_in(from);
        let transition = machine.transition_to(to).unwrap();
        assert_eq!(transition.from, from);
        assert_eq!(transition.to, to);
        assert_eq!(machine.current(), to);
    }

    #[rstest]
    #[case(KioskMode::Registration, KioskMode::HoursCheck)]
    #[case(KioskMode::HoursCheck, KioskMode::Registration)]
    #[case(KioskMode::Asleep, KioskMode::Registration)]
    #[case(KioskMode::Asleep, KioskMode::Asleep)]
    #[case(KioskMode::Attendance, KioskMode::Attendance)]
    fn test_invalid_transitions(#[case] from: KioskMode, #[case] to: KioskMode) {
        let mut machine = ModeMachine::starting_in(from);
        let err = machine.transition_to(to).unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition { .. }));
        assert_eq!(machine.current(), from);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut machine = ModeMachine::new();
        for _ in 0..(MAX_HISTORY_SIZE + 10) {
            let next = if machine.is(KioskMode::Attendance) {
                KioskMode::HoursCheck
            } else {
                KioskMode::Attendance
            };
            machine.transition_to(next).unwrap();
        }
        assert_eq!(machine.history().len(), MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_asleep_does_not_read_cards() {
        assert!(!KioskMode::Asleep.reads_cards());
        assert!(KioskMode::Registration.reads_cards());
    }
}
