//! Simulated readers, driven from tests and the console frontend.

pub mod rfid;

pub use rfid::{MockRfid, MockRfidHandle};
