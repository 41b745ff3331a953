//! Member-facing and operator-facing texts.
//!
//! Status texts go to the large status line and auto-clear; log texts go to
//! the activity log; notes are stored on the session records.

use chrono::{DateTime, FixedOffset};
use rollcall_core::TimeOfDay;

pub const STARTED: &str = "Application started. Waiting for RFID cards...";
pub const WAKING: &str = "Good morning! System resuming normal operation.";
pub const UNKNOWN_CARD: &str = "Error: Unknown RFID card.";
pub const INVALID_CARD: &str = "Error: Invalid card read.";
pub const SIGN_IN_FAILED: &str = "Error recording sign in.";
pub const SIGN_OUT_FAILED: &str = "Error recording sign out.";
pub const PLEASE_WAIT: &str = "Please wait...";

pub const REGISTRATION_PROMPT: &str = "Tap a card to register";
pub const NO_CARD_SCANNED: &str = "Please tap an RFID card";
pub const NO_POSITION_SELECTED: &str = "Please select a valid position.";
pub const POSITION_HAS_CARD: &str =
    "This position already has an RFID card registered. Enable override to overwrite it.";
pub const REGISTRATION_FAILED: &str = "Failed to update RFID card";

pub const HOURS_PROMPT: &str = "Tap a card to check hours";

/// Wall-clock time as shown on the kiosk, e.g. `07:05 PM`.
pub fn clock_time(at: &DateTime<FixedOffset>) -> String {
    at.format("%I:%M %p").to_string()
}

pub fn welcome(first_name: &str, at: &DateTime<FixedOffset>) -> String {
    format!("Welcome {first_name}! Signed in at {}", clock_time(at))
}

pub fn goodbye(first_name: &str, at: &DateTime<FixedOffset>) -> String {
    format!("Good bye, {first_name}! Signed out at {}", clock_time(at))
}

pub fn before_hours(start: TimeOfDay) -> String {
    format!("Sign-in not allowed before {}", start.to_12h())
}

pub fn after_hours(cutoff: TimeOfDay) -> String {
    format!("Sign-in not allowed after {}", cutoff.to_12h())
}

pub fn processing_error(error: &impl std::fmt::Display) -> String {
    format!("Error processing card: {error}")
}

pub fn sleeping(wake: TimeOfDay) -> String {
    format!("System entering sleep mode until {}.", wake.to_12h())
}

pub fn sign_in_logged(label: &str) -> String {
    format!("Sign in recorded for {label}.")
}

pub fn sign_out_logged(label: &str, duration_hours: f64) -> String {
    format!("Sign out recorded for {label}. Duration: {duration_hours:.2} hours.")
}

// Notes stored on session rows

pub fn signed_in_note(first_name: &str) -> String {
    format!("{first_name} Signed In")
}

pub fn signed_out_note(first_name: &str) -> String {
    format!("{first_name} Signed Out")
}

pub fn auto_signed_out_note(first_name: &str) -> String {
    format!("{first_name} Automatically signed out.")
}

pub fn auto_signout_summary<S: AsRef<str>>(labels: &[S]) -> String {
    let joined: Vec<&str> = labels.iter().map(AsRef::as_ref).collect();
    format!("Auto sign-out executed for: {}", joined.join(", "))
}

// Registration screen

pub fn card_already_registered(position: &str) -> String {
    format!("This card is already registered to position: {position}")
}

pub fn card_detected(card: &str) -> String {
    format!("Card detected: {card}")
}

pub fn registered(position: &str) -> String {
    format!("Successfully updated RFID card for position: {position}")
}

// Hours screen

pub fn no_hours(name: &str) -> String {
    format!("No hours recorded this week for {name}")
}

/// `{h}h {m}m`, minutes truncated.
pub fn hours_minutes(duration_hours: f64) -> String {
    let duration_hours = duration_hours.max(0.0);
    let hours = duration_hours.trunc();
    let minutes = ((duration_hours - hours) * 60.0).trunc();
    format!("{}h {}m", hours as u64, minutes as u64)
}
