//! Drive Arduino-style boards over the Firmata protocol.
//!
//! firmata keeps a local mirror of every pin and port of a connected board,
//! decodes the device's reports into that mirror on a background thread,
//! and encodes pin operations into wire commands.
//!
//! # Crate Structure
//!
//! - [`transport`] - Serial device acquisition and enumeration
//! - [`codec`] - Message framing for channel, simple and SysEx commands
//! - [`board`] - Board, pins, ports and change notifications
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use firmata::board::{Board, BoardConfig, PinMode};
//! use firmata::transport::SerialConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let serial = SerialConfig::new("/dev/ttyACM0");
//! let board = Arc::new(Board::open(&serial, BoardConfig::default())?);
//! board.start_listening()?;
//!
//! let led = board.digital(13)?;
//! led.write(true)?;
//!
//! let sensor = board.analog(0)?;
//! sensor.enable_reporting()?;
//! board.digital(2)?.set_mode(PinMode::Input)?;
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use firmata_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use firmata_codec::*;
}

/// Re-export board types.
pub mod board {
    pub use firmata_board::*;
}

pub use firmata_board::{Board, BoardConfig, BoardError, BoardType, Pin, PinId, PinMode, PinValue};
