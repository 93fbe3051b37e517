use std::time::{Duration, Instant};

use firmata_board::{Board, PinMode, PinState};
use serde::Serialize;

use crate::cmd::{parse_duration, InfoArgs};
use crate::exit::{board_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{pin_table, print_json, OutputFormat};

#[derive(Serialize)]
struct InfoOutput {
    name: String,
    board_type: String,
    firmata_version: Option<String>,
    firmware: Option<String>,
    analog_pins: usize,
    digital_pins: usize,
    ports: usize,
    pwm_pins: Vec<u8>,
    pins: Vec<PinState>,
}

impl InfoOutput {
    fn collect(board: &Board) -> Self {
        let pins = board.snapshot();
        Self {
            name: board.name().to_string(),
            board_type: board.board_type().name.clone(),
            firmata_version: board
                .firmata_version()
                .map(|(major, minor)| format!("{major}.{minor}")),
            firmware: board.firmware(),
            analog_pins: board.analog_pins().len(),
            digital_pins: board.digital_pins().len(),
            ports: board.ports().len(),
            pwm_pins: board.board_type().pwm_pins.iter().copied().collect(),
            pins,
        }
    }
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout, false)?;
    let board = args.connect.open()?;

    board
        .query_version()
        .and_then(|()| board.query_firmware())
        .map_err(|err| board_error("query failed", err))?;

    let reported = wait_for(timeout, || board.firmware().is_some());
    let out = InfoOutput::collect(&board);
    board
        .close()
        .map_err(|err| board_error("close failed", err))?;

    if !reported {
        return Err(CliError::new(
            TIMEOUT,
            format!("no firmware report from {} within {timeout:?}", out.name),
        ));
    }

    print_info(&out, format);
    Ok(SUCCESS)
}

fn wait_for(timeout: Duration, mut ready: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    loop {
        if ready() {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            print_summary(out);
            let usable: Vec<PinState> = out
                .pins
                .iter()
                .filter(|pin| pin.mode != PinMode::Unavailable)
                .cloned()
                .collect();
            println!("{}", pin_table(&usable));
        }
        OutputFormat::Pretty => print_summary(out),
    }
}

fn print_summary(out: &InfoOutput) {
    println!("Board Info:");
    println!("  Name:         {}", out.name);
    println!("  Board type:   {}", out.board_type);
    println!(
        "  Firmware:     {} ({})",
        out.firmware.as_deref().unwrap_or("unknown"),
        out.firmata_version.as_deref().unwrap_or("?")
    );
    println!(
        "  Pins:         {} analog, {} digital in {} ports",
        out.analog_pins, out.digital_pins, out.ports
    );
    let pwm = out
        .pwm_pins
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    println!("  PWM:          {pwm}");
}
