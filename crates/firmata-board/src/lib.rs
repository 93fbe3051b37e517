//! Pin/port state mirror and decode loop for Firmata boards.
//!
//! A [`Board`] owns every pin and port of the device, a decode loop that
//! turns inbound messages into state changes, and the write-side API that
//! turns pin operations into wire commands. Observers learn about every
//! mode, reporting and value change through the board's change bus.

pub mod board;
pub mod board_type;
pub mod error;
pub mod events;
pub mod listener;
pub mod pin;
pub mod port;

#[cfg(test)]
mod fake_serial;

pub use board::{Board, BoardConfig, DEFAULT_STARTUP_DELAY};
pub use board_type::{BoardType, PINS_PER_PORT};
pub use error::{BoardError, Result};
pub use events::{Change, ChangeBus, ChangeEvent, Phase, SubscriptionId};
pub use pin::{Pin, PinClass, PinId, PinMode, PinState, PinValue};
pub use port::{Port, PortState};
