use crate::{
    Result,
    constants::{MAX_CARD_ID_LENGTH, MIN_CARD_ID_LENGTH},
    error::Error,
};
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Primary key of a member record.
pub type MemberId = i64;

/// Primary key of an attendance session.
pub type SessionId = i64;

/// Card identifier as produced by the card reader (e.g. "123456").
///
/// # Security
/// Comparison is constant-time so that probing the directory with partial
/// card numbers does not leak how much of a tag matched.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
    /// Create a new card identifier with validation.
    ///
    /// Surrounding whitespace is trimmed. Case is kept: tags are matched
    /// exactly as the directory stores them.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardFormat` if:
    /// - The identifier is empty after trimming or longer than the maximum length
    /// - The identifier contains non-ASCII or whitespace characters
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim().to_string();

        let len = id.len();
        if !(MIN_CARD_ID_LENGTH..=MAX_CARD_ID_LENGTH).contains(&len) {
            return Err(Error::InvalidCardFormat(format!(
                "Card id must be {MIN_CARD_ID_LENGTH}-{MAX_CARD_ID_LENGTH} chars, got {len}"
            )));
        }

        if !id.is_ascii() || id.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(Error::InvalidCardFormat(
                "Card id must be ASCII without whitespace".to_string(),
            ));
        }

        Ok(CardId(id))
    }

    /// Get the card identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardId::new(s)
    }
}

impl TryFrom<String> for CardId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CardId::new(&value)
    }
}

impl From<CardId> for String {
    fn from(card: CardId) -> Self {
        card.0
    }
}

impl PartialEq for CardId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl PartialEq<str> for CardId {
    fn eq(&self, other: &str) -> bool {
        self.0.as_bytes().ct_eq(other.as_bytes()).into()
    }
}

impl std::hash::Hash for CardId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// A wall-clock time of day with minute resolution.
///
/// Used for the configured sign-in start, sleep and wake boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Create a time of day.
    ///
    /// # Errors
    /// Returns `Error::Config` if the hour is above 23 or the minute above 59.
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::Config(format!(
                "Invalid time of day {hour:02}:{minute:02}"
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Midnight.
    pub const fn midnight() -> Self {
        Self { hour: 0, minute: 0 }
    }

    #[must_use]
    pub fn hour(&self) -> u8 {
        self.hour
    }

    #[must_use]
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Time of day of a local timestamp, truncated to the minute.
    pub fn of<T: Timelike>(time: &T) -> Self {
        // hour() < 24 and minute() < 60 by construction
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    /// Returns `true` if `time` is strictly before this time of day.
    pub fn is_after<T: Timelike>(&self, time: &T) -> bool {
        Self::of(time) < *self
    }

    /// Format as a 12-hour clock string, e.g. `7:00 AM`.
    #[must_use]
    pub fn to_12h(&self) -> String {
        let (suffix, hour) = match self.hour {
            0 => ("AM", 12),
            h @ 1..=11 => ("AM", h),
            12 => ("PM", 12),
            h => ("PM", h - 12),
        };
        format!("{hour}:{:02} {suffix}", self.minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
