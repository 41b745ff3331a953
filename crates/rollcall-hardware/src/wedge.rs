//! Keyboard-wedge card reader.
//!
//! Many USB RFID readers present themselves as a keyboard and "type" the
//! card number followed by Enter. [`WedgeRfid`] consumes such lines from a
//! channel; whoever owns the input stream (a terminal, an evdev device)
//! forwards each line into it.

use crate::{
    HardwareError, Result,
    traits::{CardData, RfidDevice},
    types::{LedColor, ReaderInfo},
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Reader fed by lines of text, one card id per line.
///
/// # Examples
///
/// ```
/// use rollcall_hardware::traits::RfidDevice;
/// use rollcall_hardware::wedge::WedgeRfid;
///
/// #[tokio::main]
/// async fn main() -> rollcall_hardware::Result<()> {
///     let (mut reader, lines) = WedgeRfid::channel(16);
///
///     lines.send("0004567890\n".to_string()).await.unwrap();
///     let card = reader.poll_card().await?.unwrap();
///     assert_eq!(card.id, "0004567890");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct WedgeRfid {
    lines: mpsc::Receiver<String>,
    name: String,
}

impl WedgeRfid {
    /// Wrap an existing line receiver.
    pub fn new(lines: mpsc::Receiver<String>) -> Self {
        Self {
            lines,
            name: "Keyboard Wedge Reader".to_string(),
        }
    }

    /// Create a reader together with the sender that feeds it.
    pub fn channel(capacity: usize) -> (Self, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(rx), tx)
    }
}

impl RfidDevice for WedgeRfid {
    async fn poll_card(&mut self) -> Result<Option<CardData>> {
        loop {
            match self.lines.try_recv() {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => return CardData::from_text(&line).map(Some),
                // a closed input stream reads as an empty field
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return Ok(None),
            }
        }
    }

    async fn reinitialize(&mut self) -> Result<()> {
        let mut discarded = 0usize;
        while self.lines.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(discarded, "dropped pending wedge input on reinitialize");
        }
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        Ok(())
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(self.name.clone()))
    }

    async fn set_led(&mut self, _color: LedColor) -> Result<()> {
        Err(HardwareError::unsupported("set_led"))
    }
}
