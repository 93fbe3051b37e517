//! Print analog pin 0 readings as they arrive.
//!
//! Run with:
//!   cargo run --example analog-monitor -- /dev/ttyACM0

use std::sync::Arc;
use std::time::Duration;

use firmata::board::{Board, BoardConfig, Change, Phase};
use firmata::transport::SerialConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| firmata::transport::DEFAULT_PATH.to_string());

    let board = Arc::new(Board::open(
        &SerialConfig::new(&path),
        BoardConfig::new(&path),
    )?);
    board.start_listening()?;

    board.subscribe(|event| {
        if let (Phase::After, Change::Value { to: Some(value), .. }) = (event.phase, event.change) {
            eprintln!("{}: {value}", event.pin);
        }
    });

    board.set_sampling_interval(100)?;
    board.analog(0)?.enable_reporting()?;

    std::thread::sleep(Duration::from_secs(10));

    board.analog(0)?.disable_reporting()?;
    board.close()?;
    Ok(())
}
