//! A reader with nothing behind it but a channel.

use crate::{
    HardwareError, Result,
    traits::{CardData, RfidDevice},
    types::{LedColor, ReaderInfo},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

const QUEUE_DEPTH: usize = 32;

/// Programmable reader.
///
/// Whatever the [`MockRfidHandle`] presents is returned by the next
/// [`poll_card`](RfidDevice::poll_card), one card per poll. Read failures
/// can be queued to exercise the recovery path.
///
/// ```
/// use rollcall_hardware::mock::MockRfid;
/// use rollcall_hardware::traits::RfidDevice;
///
/// #[tokio::main]
/// async fn main() -> rollcall_hardware::Result<()> {
///     let (mut reader, handle) = MockRfid::new();
///
///     handle.present_uid(&[0x01, 0x02, 0x03, 0x04]).await?;
///
///     let card = reader.poll_card().await?.unwrap();
///     assert_eq!(card.id, "16909060");
///     assert!(reader.poll_card().await?.is_none());
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockRfid {
    queue: mpsc::Receiver<Presented>,
    name: String,
    led: LedColor,
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    reinitialized: AtomicUsize,
    released: AtomicUsize,
}

#[derive(Debug)]
enum Presented {
    Card(CardData),
    Failure(String),
}

impl MockRfid {
    pub fn new() -> (Self, MockRfidHandle) {
        Self::with_name("Mock RFID Reader")
    }

    pub fn with_name(name: impl Into<String>) -> (Self, MockRfidHandle) {
        let name = name.into();
        let (tx, queue) = mpsc::channel(QUEUE_DEPTH);
        let counters = Arc::new(Counters::default());

        let reader = Self {
            queue,
            name: name.clone(),
            led: LedColor::Off,
            counters: counters.clone(),
        };
        (reader, MockRfidHandle { tx, name, counters })
    }

    pub fn led_color(&self) -> LedColor {
        self.led
    }
}

impl RfidDevice for MockRfid {
    async fn poll_card(&mut self) -> Result<Option<CardData>> {
        match self.queue.try_recv() {
            Ok(Presented::Card(card)) => Ok(Some(card)),
            Ok(Presented::Failure(message)) => Err(HardwareError::read_failed(message)),
            // a dropped handle looks like an empty field
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(None),
        }
    }

    async fn reinitialize(&mut self) -> Result<()> {
        while self.queue.try_recv().is_ok() {}
        self.led = LedColor::Off;
        self.counters.reinitialized.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        self.led = LedColor::Off;
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(self.name.clone()).with_led())
    }

    async fn set_led(&mut self, color: LedColor) -> Result<()> {
        self.led = color;
        Ok(())
    }
}

/// Drives a [`MockRfid`] from outside the polling task.
#[derive(Debug, Clone)]
pub struct MockRfidHandle {
    tx: mpsc::Sender<Presented>,
    name: String,
    counters: Arc<Counters>,
}

impl MockRfidHandle {
    /// Hold a card with the given stored identifier against the reader.
    ///
    /// # Errors
    ///
    /// `InvalidCard` for a blank id, `Disconnected` once the reader is gone.
    pub async fn present_id(&self, id: &str) -> Result<()> {
        let card = CardData::from_text(id)?;
        self.send(Presented::Card(card)).await
    }

    /// Hold a card with the given raw UID against the reader.
    ///
    /// # Errors
    ///
    /// `InvalidCard` for a UID of the wrong length, `Disconnected` once the
    /// reader is gone.
    pub async fn present_uid(&self, uid: &[u8]) -> Result<()> {
        let card = CardData::from_uid(uid)?;
        self.send(Presented::Card(card)).await
    }

    /// Make the next poll fail.
    pub async fn fail_next_read(&self, message: impl Into<String>) -> Result<()> {
        self.send(Presented::Failure(message.into())).await
    }

    async fn send(&self, presented: Presented) -> Result<()> {
        self.tx
            .send(presented)
            .await
            .map_err(|_| HardwareError::disconnected(self.name.clone()))
    }

    pub fn reinitialize_count(&self) -> usize {
        self.counters.reinitialized.load(Ordering::Relaxed)
    }

    pub fn release_count(&self) -> usize {
        self.counters.released.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_presented_uid_read_as_decimal() {
        let (mut reader, handle) = MockRfid::new();

        handle.present_uid(&[0x04, 0xAB, 0xCD, 0xEF]).await.unwrap();

        let card = reader.poll_card().await.unwrap().unwrap();
        assert_eq!(card.id, "78368239");
    }

    #[tokio::test]
    async fn test_short_uid_rejected_before_queueing() {
        let (mut reader, handle) = MockRfid::new();

        assert!(handle.present_uid(&[0x01, 0x02]).await.is_err());
        assert!(reader.poll_card().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cards_read_one_per_poll() {
        let (mut reader, handle) = MockRfid::new();

        handle.present_id("111").await.unwrap();
        handle.present_id("222").await.unwrap();

        assert_eq!(reader.poll_card().await.unwrap().unwrap().id, "111");
        assert_eq!(reader.poll_card().await.unwrap().unwrap().id, "222");
        assert!(reader.poll_card().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failure_then_recovers() {
        let (mut reader, handle) = MockRfid::new();

        handle.fail_next_read("CRC error").await.unwrap();
        handle.present_id("123456").await.unwrap();

        assert!(matches!(
            reader.poll_card().await,
            Err(HardwareError::ReadFailed { .. })
        ));
        assert_eq!(reader.poll_card().await.unwrap().unwrap().id, "123456");
    }

    #[tokio::test]
    async fn test_reinitialize_discards_pending() {
        let (mut reader, handle) = MockRfid::new();

        handle.present_id("111").await.unwrap();
        reader.reinitialize().await.unwrap();

        assert!(reader.poll_card().await.unwrap().is_none());
        assert_eq!(handle.reinitialize_count(), 1);
    }

    #[tokio::test]
    async fn test_release_turns_led_off() {
        let (mut reader, handle) = MockRfid::new();

        reader.set_led(LedColor::Green).await.unwrap();
        reader.release().await.unwrap();

        assert_eq!(reader.led_color(), LedColor::Off);
        assert_eq!(handle.release_count(), 1);
    }

    #[tokio::test]
    async fn test_present_after_reader_dropped() {
        let (reader, handle) = MockRfid::with_name("Front desk");
        drop(reader);

        assert!(matches!(
            handle.present_id("1").await,
            Err(HardwareError::Disconnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_reader_info() {
        let (reader, handle) = MockRfid::with_name("Test Reader");

        let info = reader.get_reader_info().await.unwrap();
        assert_eq!(info.name, "Test Reader");
        assert!(info.has_led);
        assert_eq!(handle.name(), "Test Reader");
    }
}
