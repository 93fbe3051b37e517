/// Errors that can occur while encoding or decoding Firmata messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A status byte with no known length was read. The byte has been
    /// consumed; decoding resumes at the next status byte.
    #[error("framing desync on status byte 0x{lead:02X}")]
    FramingDesync { lead: u8 },

    /// A status byte arrived where a data byte was required. The partial
    /// message has been dropped; decoding resumes at the interrupting byte.
    #[error("message 0x{command:02X} interrupted by status byte 0x{byte:02X}")]
    Interrupted { command: u8, byte: u8 },

    /// An unterminated SysEx message exceeded the configured bound.
    #[error("sysex too large ({size} bytes, max {max})")]
    SysexTooLarge { size: usize, max: usize },

    /// A data byte passed for encoding does not fit in 7 bits.
    #[error("data byte 0x{byte:02X} does not fit in 7 bits")]
    DataByteOutOfRange { byte: u8 },

    /// A lead byte passed for encoding is not a status byte.
    #[error("0x{byte:02X} is not a status byte")]
    InvalidLead { byte: u8 },

    /// The channel nibble only holds 0-15.
    #[error("channel {channel} out of range (max 15)")]
    ChannelOutOfRange { channel: u8 },

    /// A channel message carries no channel byte.
    #[error("channel message 0x{command:02X} has no channel")]
    MissingChannel { command: u8 },

    /// An I/O error occurred while reading or writing.
    #[error("codec I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,
}

impl CodecError {
    /// True for errors after which the stream is still usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CodecError::FramingDesync { .. }
                | CodecError::Interrupted { .. }
                | CodecError::SysexTooLarge { .. }
        )
    }

    /// True when a blocking read gave up because its timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CodecError::Io(err)
                if matches!(err.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock)
        )
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
