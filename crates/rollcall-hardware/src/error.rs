//! Card reader errors.
//!
//! None of these reach a member: the polling task reports them as
//! [`ReaderEvent::DeviceError`](crate::ReaderEvent::DeviceError),
//! reinitializes the reader and keeps going.

pub type Result<T> = std::result::Result<T, HardwareError>;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The reader (or whatever feeds it) went away.
    #[error("Reader disconnected: {reader}")]
    Disconnected { reader: String },

    /// The reader lacks the capability, e.g. an LED.
    #[error("Not supported by this reader: {operation}")]
    Unsupported { operation: &'static str },

    /// The reader produced something that is not a card id.
    #[error("Invalid card: {message}")]
    InvalidCard { message: String },

    /// A read failed part way (collision, CRC error, bus error).
    #[error("Read failed: {message}")]
    ReadFailed { message: String },
}

impl HardwareError {
    pub fn disconnected(reader: impl Into<String>) -> Self {
        Self::Disconnected {
            reader: reader.into(),
        }
    }

    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    pub fn invalid_card(message: impl Into<String>) -> Self {
        Self::InvalidCard {
            message: message.into(),
        }
    }

    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::ReadFailed {
            message: message.into(),
        }
    }
}
