use firmata_board::{PinMode, PinValue};
use serde::Serialize;

use crate::cmd::WriteArgs;
use crate::exit::{board_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct WriteOutput {
    pin: String,
    mode: PinMode,
    value: PinValue,
}

pub fn run(args: WriteArgs, format: OutputFormat) -> CliResult<i32> {
    check_mode(args.mode)?;
    let board = args.connect.open()?;
    let pin = board
        .pin(args.pin)
        .map_err(|err| board_error("unknown pin", err))?;

    pin.set_mode(args.mode)
        .map_err(|err| board_error("set mode failed", err))?;
    pin.write(args.value)
        .map_err(|err| board_error("write failed", err))?;
    let written = pin.value().unwrap_or(args.value);
    board
        .close()
        .map_err(|err| board_error("close failed", err))?;

    match format {
        OutputFormat::Json => print_json(&WriteOutput {
            pin: args.pin.to_string(),
            mode: args.mode,
            value: written,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{} ({}) <- {written}", args.pin, args.mode);
        }
    }
    Ok(SUCCESS)
}

/// Only output modes can be written.
fn check_mode(mode: PinMode) -> CliResult<()> {
    match mode {
        PinMode::Output | PinMode::Pwm => Ok(()),
        other => Err(CliError::new(
            USAGE,
            format!("cannot write a pin in {other} mode (use output or pwm)"),
        )),
    }
}
