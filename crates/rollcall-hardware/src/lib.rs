//! Card reader abstraction for the rollcall attendance kiosk.
//!
//! The kiosk identifies members by the card they hold against a reader. This
//! crate hides the reader behind the [`RfidDevice`] trait and runs it in a
//! restartable background task ([`CardReader`]) that forwards every card it
//! reads over a channel.
//!
//! # Devices
//!
//! - [`mock::MockRfid`]: programmable reader for development and tests
//! - [`wedge::WedgeRfid`]: keyboard-wedge reader fed one line per card
//!
//! Both are wrapped by [`devices::AnyRfidDevice`] for concrete dispatch.
//!
//! ```no_run
//! use rollcall_hardware::traits::RfidDevice;
//! use rollcall_hardware::types::LedColor;
//! use rollcall_hardware::error::Result;
//!
//! async fn identify<R: RfidDevice>(reader: &mut R) -> Result<Option<String>> {
//!     let Some(card) = reader.poll_card().await? else {
//!         return Ok(None);
//!     };
//!     reader.set_led(LedColor::Green).await.ok();
//!     Ok(Some(card.id))
//! }
//! ```
//!
//! # Lifecycle
//!
//! Readers are started when the kiosk wakes or enters a screen that reads
//! cards, and stopped when it sleeps. Every switch goes through
//! stop, reinitialize, start, so stale input never leaks from one screen into
//! the next. See [`reader`] for details.
//!
//! # Thread Safety
//!
//! All devices are `Send + Sync`; the polling task may migrate between
//! Tokio worker threads.

pub mod devices;
pub mod error;
pub mod mock;
pub mod reader;
pub mod traits;
pub mod types;
pub mod wedge;

pub use error::{HardwareError, Result};
pub use traits::{CardData, MAX_UID_LENGTH, MIN_UID_LENGTH, RfidDevice, uid_decimal};
pub use types::{LedColor, ReaderInfo};

pub use devices::AnyRfidDevice;
pub use reader::{CardReader, ReaderConfig, ReaderEvent, StopOutcome};
