use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use firmata_board::{ChangeEvent, PinState, PinValue};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

#[derive(Serialize)]
struct EventOutput<'a> {
    event: &'a str,
    pin: String,
    #[serde(flatten)]
    change: &'a firmata_board::Change,
    timestamp: String,
}

/// Prints one change event as it arrives.
///
/// Table output degrades to one line per event; a table per event would
/// be unreadable on a live stream.
pub fn print_event(event: &ChangeEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EventOutput {
            event: event.kind(),
            pin: event.pin.to_string(),
            change: &event.change,
            timestamp: now_unix_millis(),
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{} {}: {}", now_unix_millis(), event.pin, describe(event));
        }
    }
}

fn describe(event: &ChangeEvent) -> String {
    match event.change {
        firmata_board::Change::PinMode { from, to } => format!("mode {from} -> {to}"),
        firmata_board::Change::Reporting { from, to } => format!("reporting {from} -> {to}"),
        firmata_board::Change::Value { from, to } => {
            format!("value {} -> {}", value_text(from), value_text(to))
        }
    }
}

pub fn value_text(value: Option<PinValue>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Renders pin states as a table.
pub fn pin_table(pins: &[PinState]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["PIN", "MODE", "PWM", "PORT", "REPORTING", "VALUE"]);
    for pin in pins {
        table.add_row(vec![
            pin.id.to_string(),
            pin.mode.to_string(),
            if pin.pwm { "yes" } else { "" }.to_string(),
            pin.port.map(|p| p.to_string()).unwrap_or_default(),
            pin.reporting.to_string(),
            value_text(pin.value),
        ]);
    }
    table
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
