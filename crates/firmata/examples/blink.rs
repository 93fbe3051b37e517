//! Blink the on-board LED.
//!
//! Run with:
//!   cargo run --example blink -- /dev/ttyACM0

use std::time::Duration;

use firmata::board::{Board, BoardConfig};
use firmata::transport::SerialConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| firmata::transport::DEFAULT_PATH.to_string());

    let board = Board::open(&SerialConfig::new(&path), BoardConfig::new(&path))?;
    eprintln!("Opened {board}");

    let led = board.digital(13)?;
    for _ in 0..10 {
        led.write(true)?;
        std::thread::sleep(Duration::from_millis(500));
        led.write(false)?;
        std::thread::sleep(Duration::from_millis(500));
    }

    board.close()?;
    Ok(())
}
