//! Background card polling.
//!
//! [`CardReader`] owns a reader device and, while started, polls it from a
//! dedicated tokio task. Cards are forwarded over an mpsc channel to the
//! single consumer (the kiosk loop), which drains it on its own schedule.
//!
//! ```text
//! ┌──────────────┐  poll_card()  ┌───────────┐  ReaderEvent  ┌────────────┐
//! │ RfidDevice   │◄──────────────│ poll task │──────────────►│ kiosk loop │
//! │ (Mutex)      │   every 500ms └───────────┘    (mpsc)     └────────────┘
//! └──────────────┘
//! ```
//!
//! The reader can be started, stopped and reinitialized any number of times
//! over the process lifetime. Stopping is cooperative: a flag checked on
//! every iteration, with the join bounded by a timeout after which the task
//! is aborted.
//!
//! # Examples
//!
//! ```no_run
//! use rollcall_hardware::devices::AnyRfidDevice;
//! use rollcall_hardware::mock::MockRfid;
//! use rollcall_hardware::reader::{CardReader, ReaderConfig, ReaderEvent};
//!
//! #[tokio::main]
//! async fn main() -> rollcall_hardware::Result<()> {
//!     let (device, handle) = MockRfid::new();
//!     let (mut reader, mut events) = CardReader::new(AnyRfidDevice::Mock(device), ReaderConfig::default());
//!
//!     reader.start();
//!     handle.present_id("123456").await?;
//!
//!     if let Some(ReaderEvent::CardRead(card)) = events.recv().await {
//!         println!("card {}", card.id);
//!     }
//!
//!     reader.stop().await;
//!     Ok(())
//! }
//! ```

use crate::devices::AnyRfidDevice;
use crate::traits::RfidDevice;
use crate::{CardData, LedColor, ReaderInfo, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Event produced by the polling task.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ReaderEvent {
    /// A card was read.
    CardRead(CardData),

    /// A read failed; the task reinitialized the device and keeps polling.
    DeviceError {
        /// Error message.
        error: String,
    },
}

/// Polling configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Pause between two polls.
    pub poll_interval: Duration,

    /// Upper bound on waiting for the task to exit in [`CardReader::stop`].
    pub stop_timeout: Duration,

    /// Capacity of the event channel.
    pub channel_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            stop_timeout: Duration::from_millis(1000),
            channel_capacity: 32,
        }
    }
}

impl ReaderConfig {
    /// Set the pause between polls.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the stop timeout.
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }
}

/// How the polling task ended after [`CardReader::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The reader was not running.
    NotRunning,
    /// The task observed the stop flag and exited.
    Stopped,
    /// The task did not exit within the timeout and was aborted.
    Aborted,
    /// The task had panicked.
    Panicked,
}

/// Restartable background reader.
pub struct CardReader {
    /// Device shared with the polling task.
    device: Arc<Mutex<AnyRfidDevice>>,

    /// Sender cloned into each polling task.
    event_tx: mpsc::Sender<ReaderEvent>,

    /// Cooperative stop flag.
    running: Arc<AtomicBool>,

    /// Current polling task, if started.
    task: Option<JoinHandle<()>>,

    config: ReaderConfig,
}

impl CardReader {
    /// Wrap a device. Returns the reader and the receiving end of its event channel.
    pub fn new(device: AnyRfidDevice, config: ReaderConfig) -> (Self, mpsc::Receiver<ReaderEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity.max(1));

        let reader = Self {
            device: Arc::new(Mutex::new(device)),
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
            config,
        };

        (reader, event_rx)
    }

    /// Spawn the polling task.
    ///
    /// Returns `false` without side effects if the reader is already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }

        self.running.store(true, Ordering::Release);
        self.task = Some(tokio::spawn(Self::poll_task(
            self.device.clone(),
            self.event_tx.clone(),
            self.running.clone(),
            self.config.poll_interval,
        )));

        info!("card reader started");
        true
    }

    /// Whether a polling task is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the polling task.
    ///
    /// Idempotent: stopping a reader that is not running is a no-op. Waits at
    /// most [`ReaderConfig::stop_timeout`] for the task to release the device,
    /// then aborts it.
    pub async fn stop(&mut self) -> StopOutcome {
        self.running.store(false, Ordering::Release);

        let Some(mut task) = self.task.take() else {
            return StopOutcome::NotRunning;
        };

        let outcome = match tokio::time::timeout(self.config.stop_timeout, &mut task).await {
            Ok(Ok(())) => StopOutcome::Stopped,
            Ok(Err(e)) if e.is_panic() => StopOutcome::Panicked,
            Ok(Err(_)) => StopOutcome::Stopped,
            Err(_) => {
                task.abort();
                StopOutcome::Aborted
            }
        };

        match outcome {
            StopOutcome::Aborted => warn!(
                timeout_ms = self.config.stop_timeout.as_millis() as u64,
                "card reader did not stop in time, aborted"
            ),
            StopOutcome::Panicked => error!("card reader task panicked"),
            _ => info!("card reader stopped"),
        }

        outcome
    }

    /// Reset the device, discarding pending input.
    ///
    /// Safe to call while running; the reset happens between two polls.
    pub async fn reinitialize(&self) -> Result<()> {
        let mut device = self.device.lock().await;
        device.reinitialize().await?;
        debug!("card reader reinitialized");
        Ok(())
    }

    /// Set the reader LED. Readers without an LED return `Unsupported`.
    pub async fn signal(&self, color: LedColor) -> Result<()> {
        let mut device = self.device.lock().await;
        device.set_led(color).await
    }

    /// Query the device for reader information.
    pub async fn reader_info(&self) -> Result<ReaderInfo> {
        let device = self.device.lock().await;
        device.get_reader_info().await
    }

    async fn poll_task(
        device: Arc<Mutex<AnyRfidDevice>>,
        tx: mpsc::Sender<ReaderEvent>,
        running: Arc<AtomicBool>,
        poll_interval: Duration,
    ) {
        debug!(
            poll_interval_ms = poll_interval.as_millis() as u64,
            "card reader loop running"
        );

        while running.load(Ordering::Acquire) {
            let read = {
                let mut device = device.lock().await;
                device.poll_card().await
            };

            match read {
                Ok(Some(card)) => {
                    debug!(card = %card.id, "card read");
                    match tx.try_send(ReaderEvent::CardRead(card)) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(event)) => {
                            warn!("card event channel full, waiting for consumer");
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "card read failed, reinitializing reader");
                    let _ = tx.try_send(ReaderEvent::DeviceError {
                        error: e.to_string(),
                    });

                    let mut device = device.lock().await;
                    if let Err(e) = device.reinitialize().await {
                        error!(error = %e, "card reader reinitialization failed");
                    }
                }
            }

            tokio::time::sleep(poll_interval).await;
        }

        let mut device = device.lock().await;
        if let Err(e) = device.release().await {
            warn!(error = %e, "failed to release card reader");
        }
        debug!("card reader loop exited");
    }
}

impl Drop for CardReader {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRfid, MockRfidHandle};

    fn fast_config() -> ReaderConfig {
        ReaderConfig::default()
            .with_poll_interval(Duration::from_millis(5))
            .with_stop_timeout(Duration::from_millis(500))
    }

    fn mock_reader() -> (CardReader, mpsc::Receiver<ReaderEvent>, MockRfidHandle) {
        let (device, handle) = MockRfid::new();
        let (reader, events) = CardReader::new(AnyRfidDevice::Mock(device), fast_config());
        (reader, events, handle)
    }

    async fn next_event(events: &mut mpsc::Receiver<ReaderEvent>) -> ReaderEvent {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("no reader event within 2s")
            .expect("reader channel closed")
    }

    #[test]
    fn test_reader_config_default() {
        let config = ReaderConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.stop_timeout, Duration::from_millis(1000));
        assert_eq!(config.channel_capacity, 32);
    }

    #[tokio::test]
    async fn test_reader_forwards_cards() {
        let (mut reader, mut events, handle) = mock_reader();

        assert!(reader.start());
        handle.present_id("123456").await.unwrap();

        match next_event(&mut events).await {
            ReaderEvent::CardRead(card) => assert_eq!(card.id, "123456"),
            other => panic!("unexpected event: {other:?}"),
        }

        assert_eq!(reader.stop().await, StopOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let (mut reader, _events, _handle) = mock_reader();

        assert!(reader.start());
        assert!(!reader.start());
        assert!(reader.is_running());

        reader.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (mut reader, _events, _handle) = mock_reader();

        assert_eq!(reader.stop().await, StopOutcome::NotRunning);

        reader.start();
        assert_eq!(reader.stop().await, StopOutcome::Stopped);
        assert_eq!(reader.stop().await, StopOutcome::NotRunning);
        assert!(!reader.is_running());
    }

    #[tokio::test]
    async fn test_stop_releases_device() {
        let (mut reader, _events, handle) = mock_reader();

        reader.start();
        reader.stop().await;

        assert_eq!(handle.release_count(), 1);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let (mut reader, mut events, handle) = mock_reader();

        for round in 0..3 {
            reader.start();
            reader.reinitialize().await.unwrap();

            let id = format!("{}", 1000 + round);
            handle.present_id(&id).await.unwrap();
            match next_event(&mut events).await {
                ReaderEvent::CardRead(card) => assert_eq!(card.id, id),
                other => panic!("unexpected event: {other:?}"),
            }

            assert_eq!(reader.stop().await, StopOutcome::Stopped);
        }

        assert_eq!(handle.release_count(), 3);
        assert_eq!(handle.reinitialize_count(), 3);
    }

    #[tokio::test]
    async fn test_read_error_reinitializes_and_continues() {
        let (mut reader, mut events, handle) = mock_reader();

        reader.start();
        handle.fail_next_read("bad CRC").await.unwrap();

        match next_event(&mut events).await {
            ReaderEvent::DeviceError { error } => assert!(error.contains("bad CRC")),
            other => panic!("unexpected event: {other:?}"),
        }

        handle.present_id("555").await.unwrap();
        match next_event(&mut events).await {
            ReaderEvent::CardRead(card) => assert_eq!(card.id, "555"),
            other => panic!("unexpected event: {other:?}"),
        }

        assert!(handle.reinitialize_count() >= 1);
        reader.stop().await;
    }

    #[tokio::test]
    async fn test_signal_sets_led() {
        let (reader, _events, _handle) = mock_reader();

        reader.signal(LedColor::Green).await.unwrap();
        let info = reader.reader_info().await.unwrap();
        assert_eq!(info.name, "Mock RFID Reader");
    }
}
