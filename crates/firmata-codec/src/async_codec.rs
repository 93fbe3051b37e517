//! `tokio_util::codec` adapter for async byte streams.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{decode_message, encode_message, CodecConfig, Message};
use crate::error::CodecError;

/// Decodes and encodes [`Message`]s on a `Framed` stream.
///
/// Recoverable framing errors are logged and skipped rather than returned:
/// a `FramedRead` stops yielding after its decoder returns an error.
#[derive(Debug, Clone, Default)]
pub struct FirmataCodec {
    config: CodecConfig,
}

impl FirmataCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: CodecConfig) -> Self {
        Self { config }
    }
}

impl Decoder for FirmataCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        loop {
            match decode_message(src, self.config.max_sysex_size) {
                Ok(msg) => return Ok(msg),
                Err(err) if err.is_recoverable() => {
                    debug!(error = %err, "dropping malformed message");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Encoder<Message> for FirmataCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        encode_message(&item, dst)
    }
}
