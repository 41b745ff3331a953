//! Card reader trait definitions.
//!
//! The kiosk only needs one capability from the hardware: a reader that can
//! be polled for the identifier of a card held against it, and that can be
//! reinitialized and released. Native `async fn` methods (Edition 2024
//! RPITIT) keep the trait free of the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::{HardwareError, Result};
use crate::types::{LedColor, ReaderInfo};
use chrono::{DateTime, Utc};

/// Shortest UID a card may report (ISO 14443 single size).
pub const MIN_UID_LENGTH: usize = 4;

/// Longest UID a card may report (ISO 14443 triple size).
pub const MAX_UID_LENGTH: usize = 10;

/// A card read by the reader.
///
/// `id` is the identifier the rest of the system stores as the member's tag:
/// the UID rendered in decimal for readers that expose raw UIDs, or the text
/// typed by keyboard-wedge readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardData {
    pub id: String,
    pub read_at: DateTime<Utc>,
}

impl CardData {
    /// Card data from a raw UID, rendered in decimal.
    ///
    /// ```
    /// use rollcall_hardware::CardData;
    ///
    /// let card = CardData::from_uid(&[0x01, 0x02, 0x03, 0x04]).unwrap();
    /// assert_eq!(card.id, "16909060");
    /// ```
    ///
    /// # Errors
    ///
    /// `InvalidCard` if the UID is not 4 to 10 bytes long.
    pub fn from_uid(uid: &[u8]) -> Result<Self> {
        if !(MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&uid.len()) {
            return Err(HardwareError::invalid_card(format!(
                "UID must be {MIN_UID_LENGTH}-{MAX_UID_LENGTH} bytes, got {}",
                uid.len()
            )));
        }
        Ok(Self::now(uid_decimal(uid)))
    }

    /// Card data from an identifier typed by the reader.
    ///
    /// # Errors
    ///
    /// `InvalidCard` if the text is blank.
    pub fn from_text(text: &str) -> Result<Self> {
        let id = text.trim();
        if id.is_empty() {
            return Err(HardwareError::invalid_card("blank card id"));
        }
        Ok(Self::now(id.to_string()))
    }

    fn now(id: String) -> Self {
        Self {
            id,
            read_at: Utc::now(),
        }
    }
}

/// Render a UID as a decimal number, the way MFRC522 readers report it.
///
/// Only the first 8 bytes are used so the value fits in a `u64`.
pub fn uid_decimal(uid: &[u8]) -> String {
    uid.iter()
        .take(8)
        .fold(0u64, |acc, byte| acc.saturating_mul(256).saturating_add(u64::from(*byte)))
        .to_string()
}

/// A card reader.
///
/// Readers are polled: [`poll_card`](RfidDevice::poll_card) returns
/// immediately with `None` when no card is in the field, so the polling loop
/// can check its stop flag between reads.
///
/// Not object-safe (`async fn` returns `impl Future`); use generics or
/// [`AnyRfidDevice`](crate::devices::AnyRfidDevice).
pub trait RfidDevice: Send + Sync {
    /// Read a card if one is present, without waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails. Callers reinitialize the reader.
    async fn poll_card(&mut self) -> Result<Option<CardData>>;

    /// Reset the reader to a clean state, discarding pending input.
    async fn reinitialize(&mut self) -> Result<()>;

    /// Release hardware resources. A released reader may be reinitialized
    /// and polled again.
    async fn release(&mut self) -> Result<()>;

    async fn get_reader_info(&self) -> Result<ReaderInfo>;

    /// # Errors
    ///
    /// `Unsupported` if the reader has no LED.
    async fn set_led(&mut self, color: LedColor) -> Result<()>;
}
