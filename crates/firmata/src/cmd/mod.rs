use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use firmata_board::{Board, BoardConfig, BoardType, PinId, PinMode, PinValue};
use firmata_transport::{SerialConfig, DEFAULT_BAUD_RATE};

use crate::exit::{board_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod info;
pub mod monitor;
pub mod ports;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial devices.
    Ports(PortsArgs),
    /// Open a board and print its firmware and pin layout.
    Info(InfoArgs),
    /// Enable reporting on pins and print every change.
    Monitor(MonitorArgs),
    /// Set a pin's mode and drive it.
    Write(WriteArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial device and board layout shared by every board command.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Serial device path (e.g. /dev/ttyACM0, COM3).
    pub path: String,
    /// Baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Built-in board layout.
    #[arg(long, default_value = "arduino", conflicts_with = "board_file")]
    pub board_type: String,
    /// JSON file describing a custom board layout.
    #[arg(long, value_name = "FILE")]
    pub board_file: Option<PathBuf>,
    /// Wait after opening the port before sending commands (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub startup_delay: String,
}

impl ConnectArgs {
    fn board_type(&self) -> CliResult<BoardType> {
        if let Some(path) = &self.board_file {
            return BoardType::from_json_file(path)
                .map_err(|err| board_error(&format!("loading {}", path.display()), err));
        }
        BoardType::by_name(&self.board_type).ok_or_else(|| {
            CliError::new(
                USAGE,
                format!(
                    "unknown board type '{}' (expected one of: {})",
                    self.board_type,
                    BoardType::builtin_names().join(", ")
                ),
            )
        })
    }

    /// Opens the board and starts its listener.
    pub fn open(&self) -> CliResult<Arc<Board>> {
        let startup_delay = parse_duration(&self.startup_delay, true)?;
        let serial = SerialConfig::new(&self.path).with_baud_rate(self.baud);
        let config = BoardConfig::new(&self.path)
            .with_board_type(self.board_type()?)
            .with_startup_delay(startup_delay);

        let board = Board::open(&serial, config).map_err(|err| board_error("open failed", err))?;
        let board = Arc::new(board);
        board
            .start_listening()
            .map_err(|err| board_error("listener failed", err))?;
        Ok(board)
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {
    /// Only list USB devices.
    #[arg(long)]
    pub usb: bool,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// How long to wait for the firmware report (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Pins to watch (comma-separated, e.g. a0,a1,d7).
    #[arg(long, value_delimiter = ',', required = true)]
    pub pins: Vec<PinId>,
    /// Device sampling interval in milliseconds.
    #[arg(long)]
    pub interval: Option<u16>,
    /// Exit after printing N value changes.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit after this long (e.g. 30s).
    #[arg(long)]
    pub duration: Option<String>,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Pin to drive (e.g. d13, 9).
    pub pin: PinId,
    /// Level (high, low) or PWM duty cycle (0.0-1.0).
    pub value: PinValue,
    /// Mode to set before writing.
    #[arg(long, default_value = "output")]
    pub mode: PinMode,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parses `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str, allow_zero: bool) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 && !allow_zero {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("5s", false).unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2", false).unwrap(), Duration::from_secs(2));
        assert_eq!(
            parse_duration("150ms", false).unwrap(),
            Duration::from_millis(150)
        );
    }

    #[test]
    fn parse_duration_zero() {
        assert!(parse_duration("0s", false).is_err());
        assert_eq!(parse_duration("0ms", true).unwrap(), Duration::ZERO);
    }

    #[test]
    fn parse_duration_invalid() {
        let err = parse_duration("soon", false).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(parse_duration("", false).is_err());
    }

    #[test]
    fn unknown_board_type() {
        let args = ConnectArgs {
            path: "/dev/null".to_string(),
            baud: DEFAULT_BAUD_RATE,
            board_type: "teensy".to_string(),
            board_file: None,
            startup_delay: "0s".to_string(),
        };
        let err = args.board_type().unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains("arduino_mega"));
    }
}
