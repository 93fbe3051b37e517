//! Firmata wire framing.
//!
//! A single byte stream carries three kinds of message:
//! - channel commands: a status byte whose low nibble is a pin/port number,
//!   followed by a fixed count of 7-bit data bytes
//! - simple commands: a status byte `>= 0xF0` with a fixed data count
//! - SysEx: `0xF0 <command> <7-bit data>* 0xF7`
//!
//! Lengths come from a static table ([`command::data_len`]); the protocol
//! does not describe the length of an unknown command, so an unknown status
//! byte is a framing desync and decoding resumes at the next status byte.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod command;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::FirmataCodec;
pub use codec::{
    decode_message, encode_channel, encode_command, encode_message, encode_sysex, join_14bit,
    split_14bit, CodecConfig, Message, MessageKind, DEFAULT_MAX_SYSEX,
};
pub use command::*;
pub use error::{CodecError, Result};
pub use reader::MessageReader;
pub use writer::MessageWriter;
