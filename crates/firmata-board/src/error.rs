use crate::pin::{PinId, PinMode};

/// Errors that can occur in board operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The requested mode transition is not allowed for this pin.
    #[error("{pin} cannot be set to {mode}: {reason}")]
    InvalidMode {
        pin: PinId,
        mode: PinMode,
        reason: &'static str,
    },

    /// Reporting can only be enabled on INPUT pins.
    #[error("{0} is not an input and therefore cannot report")]
    NotReportable(PinId),

    /// INPUT pins cannot be written.
    #[error("{0} is set up as an INPUT and therefore cannot be written to")]
    NotWritable(PinId),

    /// The pin is marked UNAVAILABLE.
    #[error("{0} is marked as UNAVAILABLE")]
    Unavailable(PinId),

    /// A message decoded fine but no handler is registered for it.
    #[error("no handler for command 0x{0:02X}")]
    UnknownCommand(u8),

    /// A handled command arrived with the wrong number of data bytes.
    #[error("malformed 0x{command:02X} message with {len} data bytes")]
    Malformed { command: u8, len: usize },

    /// The pin does not exist on this board.
    #[error("{0} does not exist on this board")]
    NoSuchPin(PinId),

    /// The port does not exist on this board.
    #[error("Digital Port {0} does not exist on this board")]
    NoSuchPort(u8),

    /// A board-type description is inconsistent.
    #[error("invalid board type: {0}")]
    InvalidBoardType(String),

    /// Codec-level error.
    #[error("codec error: {0}")]
    Codec(#[from] firmata_codec::CodecError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] firmata_transport::TransportError),

    /// JSON deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error outside the codec (board-type files, thread spawn).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BoardError {
    /// True when a blocking read gave up because its timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BoardError::Codec(err) if err.is_timeout())
    }

    /// True when the transport reached end of stream.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            BoardError::Codec(firmata_codec::CodecError::ConnectionClosed)
        )
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;
