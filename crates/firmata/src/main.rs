mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "firmata", version, about = "Firmata board CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        env = "FIRMATA_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_write_subcommand() {
        let cli = Cli::try_parse_from([
            "firmata",
            "write",
            "/dev/ttyACM0",
            "d9",
            "0.5",
            "--mode",
            "pwm",
        ])
        .expect("write args should parse");

        let Command::Write(args) = cli.command else {
            panic!("expected write command");
        };
        assert_eq!(args.pin, firmata_board::PinId::digital(9));
        assert_eq!(args.mode, firmata_board::PinMode::Pwm);
    }

    #[test]
    fn parses_monitor_pin_list() {
        let cli = Cli::try_parse_from([
            "firmata",
            "--format",
            "json",
            "monitor",
            "/dev/ttyUSB0",
            "--pins",
            "a0,a1,d7",
            "--count",
            "10",
        ])
        .expect("monitor args should parse");

        let Command::Monitor(args) = cli.command else {
            panic!("expected monitor command");
        };
        assert_eq!(args.pins.len(), 3);
        assert_eq!(args.count, Some(10));
    }

    #[test]
    fn rejects_board_type_with_board_file() {
        let err = Cli::try_parse_from([
            "firmata",
            "info",
            "/dev/ttyUSB0",
            "--board-type",
            "arduino_mega",
            "--board-file",
            "board.json",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_invalid_pin() {
        let err = Cli::try_parse_from(["firmata", "write", "/dev/ttyUSB0", "x9", "high"])
            .expect_err("invalid pin should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
