//! Shared domain types for the rollcall attendance kiosk.
//!
//! Everything the hardware, storage and kiosk crates agree on lives here:
//! card identifiers, the attendance error taxonomy, the configuration
//! surface and the clock used to evaluate sign-in windows.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Settings;
pub use error::{Conflict, Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
