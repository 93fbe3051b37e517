use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_message, CodecConfig, Message};
use crate::error::{CodecError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;
const READ_CHUNK_SIZE: usize = 64;

/// Reads complete messages from any `Read` stream.
///
/// Handles partial reads internally: callers always get complete messages.
/// Bytes left over after a message stay buffered for the next call, so a
/// read timeout in the middle of a message loses nothing.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    config: CodecConfig,
}

impl<T: Read> MessageReader<T> {
    /// Create a new message reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    /// Create a new message reader with explicit configuration.
    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(CodecError::ConnectionClosed)` when EOF is reached.
    /// Recoverable decode errors ([`CodecError::is_recoverable`]) leave the
    /// reader ready for the next call.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            if let Some(msg) = decode_message(&mut self.buf, self.config.max_sysex_size)? {
                return Ok(msg);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(CodecError::Io(err)),
            };

            if read == 0 {
                return Err(CodecError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Number of bytes received but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}
