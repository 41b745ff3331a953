use serde::{Deserialize, Serialize};

/// What a reader reports about itself, logged when the kiosk starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReaderInfo {
    pub name: String,
    /// Whether [`set_led`](crate::RfidDevice::set_led) does anything.
    pub has_led: bool,
}

impl ReaderInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_led: false,
        }
    }

    pub fn with_led(mut self) -> Self {
        self.has_led = true;
        self
    }
}

/// Tap feedback on readers that have an LED.
///
/// Green after a recorded sign-in or sign-out, red after a rejected or
/// failed tap, yellow while a secondary screen waits for a card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    #[default]
    Off,
    Red,
    Green,
    Yellow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_info_led() {
        let info = ReaderInfo::new("Front desk");
        assert!(!info.has_led);
        assert!(info.with_led().has_led);
    }

    #[test]
    fn test_led_color_serialized_lowercase() {
        assert_eq!(serde_json::to_string(&LedColor::Yellow).unwrap(), "\"yellow\"");
        let color: LedColor = serde_json::from_str("\"green\"").unwrap();
        assert_eq!(color, LedColor::Green);
    }
}
