//! Serial transport for Firmata boards.
//!
//! Opening and configuring the serial device lives here so the protocol
//! layers above only ever see a byte-level duplex stream:
//! - [`SerialConfig`] carries the link settings (57600 8N1 by default)
//! - [`SerialStream`] implements `Read + Write` and can be split with
//!   [`SerialStream::try_clone`] into a reader half and a writer half
//!
//! This is the lowest layer of the workspace.

pub mod error;
pub mod serial;
pub mod stream;

pub use error::{Result, TransportError};
pub use serial::{available_ports, PortInfo, SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_PATH};
pub use serialport::{DataBits, Parity, StopBits};
pub use stream::SerialStream;
