//! Status display model.
//!
//! The kiosk screen is a large status line plus an operator activity log.
//! This module models both without any rendering: the front end (terminal,
//! GUI, web page) reads [`StatusDisplay`] and [`ActivityLog`] and draws them.
//!
//! # Status line
//!
//! Tap outcomes are shown as temporary messages with a tone (success,
//! error, info) and expire after the configured display duration, after
//! which the screen's default prompt returns. Expiry is driven by
//! [`StatusDisplay::update`], called from the kiosk loop.
//!
//! ```
//! use std::time::{Duration, Instant};
//! use rollcall_kiosk::display::{StatusDisplay, Tone};
//!
//! let mut display = StatusDisplay::new("Tap your card", Duration::from_secs(5));
//! let now = Instant::now();
//! display.show_at("Welcome Ada! Signed in at 09:00 AM", Tone::Success, now);
//! assert!(!display.is_default());
//!
//! assert!(display.update_at(now + Duration::from_secs(5)));
//! assert_eq!(display.text(), "Tap your card");
//! ```
//!
//! # Activity log
//!
//! A bounded list of timestamped lines. The oldest line is dropped once
//! the log holds [`MAX_ACTIVITY_LOG_LINES`] lines.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset};
use rollcall_core::constants::MAX_ACTIVITY_LOG_LINES;
use serde::Serialize;

/// Colour class of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Success,
    Error,
    Info,
}

/// A message on the status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub text: String,
    pub tone: Tone,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

/// The status line with auto-clearing temporary messages.
#[derive(Debug, Clone)]
pub struct StatusDisplay {
    /// Prompt shown when no temporary message is active.
    default_message: String,

    /// How long temporary messages stay up.
    message_duration: Duration,

    /// Temporary message with expiration instant.
    temporary: Option<(StatusMessage, Instant)>,

    /// False while the kiosk sleeps.
    visible: bool,
}

impl StatusDisplay {
    pub fn new(default_message: impl Into<String>, message_duration: Duration) -> Self {
        Self {
            default_message: default_message.into(),
            message_duration,
            temporary: None,
            visible: true,
        }
    }

    /// Show a temporary message for the configured duration.
    pub fn show(&mut self, text: impl Into<String>, tone: Tone) {
        self.show_at(text, tone, Instant::now());
    }

    /// Show a temporary message as of `now`.
    pub fn show_at(&mut self, text: impl Into<String>, tone: Tone, now: Instant) {
        let expiration = now + self.message_duration;
        self.temporary = Some((StatusMessage::new(text, tone), expiration));
    }

    /// Expire the temporary message if its time is up.
    ///
    /// Returns `true` if the display content changed.
    pub fn update(&mut self) -> bool {
        self.update_at(Instant::now())
    }

    pub fn update_at(&mut self, now: Instant) -> bool {
        if let Some((_, expiration)) = &self.temporary
            && now >= *expiration
        {
            self.temporary = None;
            return true;
        }
        false
    }

    /// Replace the default prompt, e.g. when switching screens. Clears any
    /// temporary message.
    pub fn set_default(&mut self, default_message: impl Into<String>) {
        self.default_message = default_message.into();
        self.temporary = None;
    }

    /// Drop the temporary message and show the default prompt.
    pub fn reset_to_default(&mut self) {
        self.temporary = None;
    }

    /// Hide the screen (sleep). Pending messages are discarded.
    pub fn hide(&mut self) {
        self.visible = false;
        self.temporary = None;
    }

    pub fn reveal(&mut self) {
        self.visible = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Current text: the temporary message, or the default prompt.
    pub fn text(&self) -> &str {
        match &self.temporary {
            Some((message, _)) => &message.text,
            None => &self.default_message,
        }
    }

    /// Current temporary message, if any.
    pub fn message(&self) -> Option<&StatusMessage> {
        self.temporary.as_ref().map(|(message, _)| message)
    }

    pub fn is_default(&self) -> bool {
        self.temporary.is_none()
    }
}

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub timestamp: DateTime<FixedOffset>,
    pub text: String,
    pub tone: Tone,
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.text
        )
    }
}

/// Bounded operator log.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(MAX_ACTIVITY_LOG_LINES)
    }
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, at: DateTime<FixedOffset>, text: impl Into<String>, tone: Tone) {
        self.lines.push_back(LogLine {
            timestamp: at,
            text: text.into(),
            tone,
        });
        if self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&LogLine> {
        self.lines.back()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The whole log as text, one formatted line per entry.
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(-5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 2, 9, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_new_display_shows_default() {
        let display = StatusDisplay::new("Tap your card", Duration::from_secs(5));
        assert!(display.is_default());
        assert!(display.is_visible());
        assert_eq!(display.text(), "Tap your card");
        assert!(display.message().is_none());
    }

    #[test]
    fn test_temporary_message_expires() {
        let mut display = StatusDisplay::new("Tap your card", Duration::from_secs(5));
        let now = Instant::now();

        display.show_at("Error: Unknown RFID card.", Tone::Error, now);
        assert_eq!(display.message().unwrap().tone, Tone::Error);

        assert!(!display.update_at(now + Duration::from_millis(4999)));
        assert_eq!(display.text(), "Error: Unknown RFID card.");

        assert!(display.update_at(now + Duration::from_secs(5)));
        assert!(display.is_default());
        assert!(!display.update_at(now + Duration::from_secs(6)));
    }

    #[test]
    fn test_new_message_restarts_timer() {
        let mut display = StatusDisplay::new("", Duration::from_secs(5));
        let now = Instant::now();

        display.show_at("first", Tone::Info, now);
        display.show_at("second", Tone::Success, now + Duration::from_secs(3));

        assert!(!display.update_at(now + Duration::from_secs(6)));
        assert_eq!(display.text(), "second");
    }

    #[test]
    fn test_hide_discards_message() {
        let mut display = StatusDisplay::new("Tap your card", Duration::from_secs(5));
        display.show("hello", Tone::Info);

        display.hide();
        assert!(!display.is_visible());
        assert!(display.is_default());

        display.reveal();
        assert!(display.is_visible());
    }

    #[test]
    fn test_set_default_switches_prompt() {
        let mut display = StatusDisplay::new("Tap your card", Duration::from_secs(5));
        display.show("hello", Tone::Info);
        display.set_default("Tap a card to register");
        assert_eq!(display.text(), "Tap a card to register");
    }

    #[test]
    fn test_activity_log_is_bounded() {
        let mut log = ActivityLog::with_capacity(3);
        for minute in 0..5 {
            log.push(local(minute), format!("line {minute}"), Tone::Info);
        }

        assert_eq!(log.len(), 3);
        let texts: Vec<_> = log.lines().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_activity_log_default_capacity() {
        let mut log = ActivityLog::default();
        for minute in 0..(MAX_ACTIVITY_LOG_LINES + 10) {
            log.push(local((minute % 60) as u32), "x", Tone::Info);
        }
        assert_eq!(log.len(), MAX_ACTIVITY_LOG_LINES);
    }

    #[test]
    fn test_activity_log_render() {
        let mut log = ActivityLog::default();
        log.push(local(5), "Sign in recorded for Ada (Treasurer).", Tone::Success);
        log.push(local(6), "Good morning!", Tone::Info);

        assert_eq!(
            log.render(),
            "[2026-03-02 09:05:00] Sign in recorded for Ada (Treasurer).\n\
             [2026-03-02 09:06:00] Good morning!"
        );
        assert_eq!(log.last().unwrap().text, "Good morning!");

        log.clear();
        assert!(log.is_empty());
    }
}
