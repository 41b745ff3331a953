//! Default values for the attendance kiosk.
//!
//! Every value here can be overridden through [`Settings`](crate::Settings);
//! the constants only document what a freshly installed kiosk does.
//!
//! # Usage
//!
//! ```
//! use rollcall_core::constants::*;
//! use std::time::Duration;
//!
//! let display = Duration::from_millis(DEFAULT_MESSAGE_DISPLAY_MS);
//! assert_eq!(display.as_secs(), 5);
//! assert!(DEFAULT_START_HOUR < DEFAULT_CUTOFF_HOUR);
//! ```

// ============================================================================
// Sign-in Window
// ============================================================================

/// Earliest hour at which members may sign in.
///
/// # Value: 7 (7:00 AM together with [`DEFAULT_START_MINUTE`])
pub const DEFAULT_START_HOUR: u8 = 7;

/// Minute component of the earliest sign-in time.
pub const DEFAULT_START_MINUTE: u8 = 0;

/// Hour from which sign-in is refused and the daily auto-sign-out sweep runs.
///
/// A tap at 19:59 still signs in; a tap at 20:00 is rejected as after hours.
///
/// # Value: 20 (8:00 PM)
pub const DEFAULT_CUTOFF_HOUR: u8 = 20;

// ============================================================================
// Sleep Schedule
// ============================================================================

/// Start of the nightly sleep interval.
///
/// # Value: 20:00
pub const DEFAULT_SLEEP_HOUR: u8 = 20;

/// Minute component of the sleep start.
pub const DEFAULT_SLEEP_MINUTE: u8 = 0;

/// End of the sleep interval on weekdays.
///
/// # Value: 07:00, aligned with the sign-in start
pub const DEFAULT_WAKE_HOUR: u8 = 7;

/// Minute component of the wake time.
pub const DEFAULT_WAKE_MINUTE: u8 = 0;

/// How often the schedule controller re-evaluates the wall clock.
///
/// # Value: 60 seconds
pub const DEFAULT_SCHEDULE_POLL_SECS: u64 = 60;

// ============================================================================
// Kiosk Feedback
// ============================================================================

/// How long a status message stays on screen before it is cleared.
///
/// # Value: 5000ms
pub const DEFAULT_MESSAGE_DISPLAY_MS: u64 = 5000;

/// How long further taps are ignored after one has been processed.
///
/// Covers reader bounce and a member holding the card against the reader.
///
/// # Value: 1500ms
pub const DEFAULT_TAP_GUARD_MS: u64 = 1500;

/// Maximum number of lines kept in the operator activity log.
pub const MAX_ACTIVITY_LOG_LINES: usize = 100;

// ============================================================================
// Card Reader
// ============================================================================

/// Delay between two non-blocking reads of the card reader.
///
/// # Value: 500ms
pub const DEFAULT_READER_POLL_MS: u64 = 500;

/// Upper bound on waiting for the reader task to exit on stop.
///
/// # Value: 1000ms
pub const DEFAULT_READER_STOP_TIMEOUT_MS: u64 = 1000;

// ============================================================================
// Card Format Constraints
// ============================================================================

/// Minimum card id length (characters).
pub const MIN_CARD_ID_LENGTH: usize = 1;

/// Maximum card id length (characters).
///
/// A 10-byte UID printed in decimal never exceeds 25 digits; the extra room
/// accommodates keyboard-wedge readers that emit hex with prefixes.
pub const MAX_CARD_ID_LENGTH: usize = 64;

// ============================================================================
// Notifications
// ============================================================================

/// Timeout for a single webhook delivery.
///
/// # Value: 5 seconds
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 5;

/// Number of notifications buffered before new ones are dropped.
pub const DEFAULT_NOTIFICATION_QUEUE: usize = 64;
