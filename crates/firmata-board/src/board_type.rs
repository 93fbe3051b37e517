//! Static board layout descriptions.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, Result};

/// Pins per digital port.
pub const PINS_PER_PORT: u8 = 8;

/// Highest digital pin count a board may declare.
///
/// Channel commands address at most 16 ports of 8 pins.
pub const MAX_DIGITAL_PINS: u8 = 128;

/// Highest analog pin count a board may declare.
pub const MAX_ANALOG_PINS: u8 = 16;

/// Highest pin a PWM write can address: the analog message carries the pin
/// in its 4-bit channel nibble.
pub const MAX_PWM_PIN: u8 = 15;

/// Pin layout of a device family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardType {
    /// Family name (`arduino`, `arduino_mega`, ...).
    pub name: String,
    /// Number of digital pins, indexed from 0.
    pub digital_pins: u8,
    /// Number of analog pins, indexed from 0.
    pub analog_pins: u8,
    /// Digital pins capable of PWM output.
    #[serde(default)]
    pub pwm_pins: BTreeSet<u8>,
    /// Digital pins that cannot be used through the protocol.
    #[serde(default)]
    pub disabled_pins: BTreeSet<u8>,
    /// Whether digital pins are grouped into 8-pin ports.
    #[serde(default = "default_use_ports")]
    pub use_ports: bool,
}

fn default_use_ports() -> bool {
    true
}

impl BoardType {
    /// Arduino Uno/Duemilanove layout.
    pub fn arduino() -> Self {
        Self {
            name: "arduino".to_string(),
            digital_pins: 14,
            analog_pins: 6,
            pwm_pins: [3, 5, 6, 9, 10, 11].into_iter().collect(),
            // Rx, Tx, crystal
            disabled_pins: [0, 1, 14, 15].into_iter().collect(),
            use_ports: true,
        }
    }

    /// Arduino Mega layout.
    pub fn arduino_mega() -> Self {
        Self {
            name: "arduino_mega".to_string(),
            digital_pins: 54,
            analog_pins: 16,
            pwm_pins: (2..=14).collect(),
            disabled_pins: [0, 1, 14, 15].into_iter().collect(),
            use_ports: true,
        }
    }

    /// Look up a built-in layout by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "arduino" => Some(Self::arduino()),
            "arduino_mega" | "mega" => Some(Self::arduino_mega()),
            _ => None,
        }
    }

    /// Names accepted by [`BoardType::by_name`].
    pub fn builtin_names() -> &'static [&'static str] {
        &["arduino", "arduino_mega"]
    }

    /// Parse and validate a layout from JSON.
    pub fn from_json(input: &str) -> Result<Self> {
        let board_type: Self = serde_json::from_str(input)?;
        board_type.validate()?;
        Ok(board_type)
    }

    /// Read, parse and validate a layout from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_json(&input)
    }

    /// Check that every index fits the wire format.
    pub fn validate(&self) -> Result<()> {
        if self.digital_pins > MAX_DIGITAL_PINS {
            return Err(BoardError::InvalidBoardType(format!(
                "{} declares {} digital pins, at most {MAX_DIGITAL_PINS} are addressable",
                self.name, self.digital_pins
            )));
        }
        if self.analog_pins > MAX_ANALOG_PINS {
            return Err(BoardError::InvalidBoardType(format!(
                "{} declares {} analog pins, at most {MAX_ANALOG_PINS} are addressable",
                self.name, self.analog_pins
            )));
        }
        if let Some(pin) = self.pwm_pins.iter().find(|p| **p >= self.digital_pins) {
            return Err(BoardError::InvalidBoardType(format!(
                "{}: PWM pin {pin} is outside the digital range",
                self.name
            )));
        }
        if let Some(pin) = self.pwm_pins.iter().find(|p| **p > MAX_PWM_PIN) {
            return Err(BoardError::InvalidBoardType(format!(
                "{}: PWM pin {pin} cannot be addressed, at most pin {MAX_PWM_PIN} is",
                self.name
            )));
        }
        Ok(())
    }

    /// Number of digital ports, rounding up to cover every pin.
    pub fn port_count(&self) -> u8 {
        if !self.use_ports {
            return 0;
        }
        self.digital_pins.div_ceil(PINS_PER_PORT)
    }

    /// Number of digital pin slots, including port padding.
    pub fn digital_slots(&self) -> u8 {
        if self.use_ports {
            self.port_count() * PINS_PER_PORT
        } else {
            self.digital_pins
        }
    }

    /// True if the digital pin supports PWM.
    pub fn is_pwm(&self, pin: u8) -> bool {
        self.pwm_pins.contains(&pin)
    }

    /// True if the digital pin is reserved or outside the digital range.
    pub fn is_disabled(&self, pin: u8) -> bool {
        pin >= self.digital_pins || self.disabled_pins.contains(&pin)
    }
}

impl Default for BoardType {
    fn default() -> Self {
        Self::arduino()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arduino_layout() {
        let arduino = BoardType::arduino();
        assert_eq!(arduino.port_count(), 2);
        assert_eq!(arduino.digital_slots(), 16);
        assert!(arduino.is_pwm(9));
        assert!(!arduino.is_pwm(13));
        assert!(arduino.is_disabled(1));
        assert!(arduino.is_disabled(14));
        assert!(!arduino.is_disabled(13));
        arduino.validate().unwrap();
    }

    #[test]
    fn mega_rounds_ports_up() {
        let mega = BoardType::arduino_mega();
        assert_eq!(mega.port_count(), 7);
        assert!(mega.is_disabled(54));
        assert!(mega.is_disabled(55));
        assert!(mega.is_pwm(2));
        mega.validate().unwrap();
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(BoardType::by_name("mega"), Some(BoardType::arduino_mega()));
        assert_eq!(BoardType::by_name("arduino"), Some(BoardType::arduino()));
        assert!(BoardType::by_name("teensy").is_none());
    }

    #[test]
    fn json_defaults_to_ports() {
        let board_type = BoardType::from_json(
            r#"{"name": "tiny", "digital_pins": 5, "analog_pins": 2, "pwm_pins": [1]}"#,
        )
        .unwrap();

        assert!(board_type.use_ports);
        assert_eq!(board_type.port_count(), 1);
        assert!(board_type.disabled_pins.is_empty());
    }

    #[test]
    fn without_ports() {
        let board_type = BoardType::from_json(
            r#"{"name": "flat", "digital_pins": 4, "analog_pins": 0, "use_ports": false}"#,
        )
        .unwrap();

        assert_eq!(board_type.port_count(), 0);
        assert_eq!(board_type.digital_slots(), 4);
    }

    #[test]
    fn rejects_unaddressable_layouts() {
        let err = BoardType::from_json(r#"{"name": "big", "digital_pins": 200, "analog_pins": 0}"#)
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidBoardType(_)));

        let err = BoardType::from_json(
            r#"{"name": "odd", "digital_pins": 4, "analog_pins": 0, "pwm_pins": [9]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BoardError::InvalidBoardType(_)));
    }

    #[test]
    fn rejects_pwm_beyond_channel_nibble() {
        let err = BoardType::from_json(
            r#"{"name": "wide", "digital_pins": 24, "analog_pins": 0, "pwm_pins": [3, 20]}"#,
        )
        .unwrap_err();
        let BoardError::InvalidBoardType(message) = err else {
            panic!("expected invalid board type");
        };
        assert!(message.contains("PWM pin 20"));

        assert!(BoardType::arduino_mega().validate().is_ok());
    }

    #[test]
    fn malformed_json() {
        let err = BoardType::from_json("{").unwrap_err();
        assert!(matches!(err, BoardError::Json(_)));
    }
}
