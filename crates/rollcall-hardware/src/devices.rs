//! The reader the kiosk was started with, chosen at runtime.
//!
//! `RfidDevice` uses native `async fn`, so there is no `dyn RfidDevice`.
//! The enum keeps the polling future concrete and therefore spawnable.

use crate::mock::MockRfid;
use crate::traits::RfidDevice;
use crate::wedge::WedgeRfid;
use crate::{CardData, LedColor, ReaderInfo, Result};

#[derive(Debug)]
pub enum AnyRfidDevice {
    Mock(MockRfid),
    Wedge(WedgeRfid),
}

impl RfidDevice for AnyRfidDevice {
    async fn poll_card(&mut self) -> Result<Option<CardData>> {
        match self {
            Self::Mock(device) => device.poll_card().await,
            Self::Wedge(device) => device.poll_card().await,
        }
    }

    async fn reinitialize(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.reinitialize().await,
            Self::Wedge(device) => device.reinitialize().await,
        }
    }

    async fn release(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.release().await,
            Self::Wedge(device) => device.release().await,
        }
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        match self {
            Self::Mock(device) => device.get_reader_info().await,
            Self::Wedge(device) => device.get_reader_info().await,
        }
    }

    async fn set_led(&mut self, color: LedColor) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_led(color).await,
            Self::Wedge(device) => device.set_led(color).await,
        }
    }
}

impl From<MockRfid> for AnyRfidDevice {
    fn from(device: MockRfid) -> Self {
        Self::Mock(device)
    }
}

impl From<WedgeRfid> for AnyRfidDevice {
    fn from(device: WedgeRfid) -> Self {
        Self::Wedge(device)
    }
}
