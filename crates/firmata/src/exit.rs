use std::fmt;
use std::io;

use firmata_board::BoardError;
use firmata_codec::CodecError;
use firmata_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    match err {
        CodecError::Io(source) => io_error(context, source),
        CodecError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn board_error(context: &str, err: BoardError) -> CliError {
    match err {
        BoardError::Transport(err) => transport_error(context, err),
        BoardError::Codec(err) => codec_error(context, err),
        BoardError::Io(err) => io_error(context, err),
        BoardError::InvalidMode { .. }
        | BoardError::NotReportable(_)
        | BoardError::NotWritable(_)
        | BoardError::Unavailable(_)
        | BoardError::NoSuchPin(_)
        | BoardError::NoSuchPort(_) => CliError::new(USAGE, format!("{context}: {err}")),
        BoardError::InvalidBoardType(_) | BoardError::Json(_) | BoardError::Malformed { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use firmata_board::{PinId, PinMode};

    use super::*;

    #[test]
    fn pin_guards_are_usage_errors() {
        let err = board_error("write failed", BoardError::NotWritable(PinId::digital(4)));
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("write failed: Digital pin 4"));

        let err = board_error(
            "set mode failed",
            BoardError::InvalidMode {
                pin: PinId::digital(2),
                mode: PinMode::Pwm,
                reason: "pin does not have PWM capabilities",
            },
        );
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn timeouts_map_to_124() {
        let err = board_error(
            "read failed",
            BoardError::Codec(CodecError::Io(io::Error::from(io::ErrorKind::TimedOut))),
        );
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn closed_transport_is_failure() {
        let err = board_error("read failed", BoardError::Codec(CodecError::ConnectionClosed));
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn bad_board_file_is_data_invalid() {
        let err = board_error("board type", BoardError::InvalidBoardType("x".into()));
        assert_eq!(err.code, DATA_INVALID);
    }
}
