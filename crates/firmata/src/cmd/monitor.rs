use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use firmata_board::{Board, Change, PinClass, PinId, PinMode, Phase};
use tracing::info;

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{board_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let deadline = args
        .duration
        .as_deref()
        .map(|d| parse_duration(d, false))
        .transpose()?
        .map(|d| Instant::now() + d);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let board = args.connect.open()?;
    let (subscription, events) = board.subscribe_channel();

    if let Some(interval) = args.interval {
        board
            .set_sampling_interval(interval)
            .map_err(|err| board_error("set sampling interval failed", err))?;
    }
    for &pin in &args.pins {
        watch(&board, pin)?;
    }
    info!(pins = args.pins.len(), "monitoring");

    let mut printed = 0usize;
    let code = loop {
        if !running.load(Ordering::SeqCst) {
            break SUCCESS;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break SUCCESS;
        }
        if !board.is_listening() {
            eprintln!("error: {board} stopped reporting");
            break FAILURE;
        }

        let event = match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break FAILURE,
        };
        if event.phase != Phase::After || !matches!(event.change, Change::Value { .. }) {
            continue;
        }
        if !args.pins.contains(&event.pin) {
            continue;
        }

        print_event(&event, format);
        printed = printed.saturating_add(1);
        if args.count.is_some_and(|count| printed >= count) {
            break SUCCESS;
        }
    };

    board.unsubscribe(subscription);
    board
        .close()
        .map_err(|err| board_error("close failed", err))?;
    Ok(code)
}

/// Puts a pin into a reporting input mode.
fn watch(board: &Board, id: PinId) -> CliResult<()> {
    let pin = board
        .pin(id)
        .map_err(|err| board_error("unknown pin", err))?;
    let armed = match id.class {
        PinClass::Analog => pin.enable_reporting(),
        PinClass::Digital => pin.set_mode(PinMode::Input),
    };
    armed.map_err(|err| board_error(&format!("cannot watch {id}"), err))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
