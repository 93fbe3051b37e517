use std::fmt;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use firmata_codec::{
    command_name, join_14bit, split_14bit, CodecConfig, Message, MessageReader, MessageWriter,
    ANALOG_MESSAGE, DIGITAL_MESSAGE, QUERY_FIRMWARE, REPORT_FIRMWARE, REPORT_VERSION,
    SAMPLING_INTERVAL, SYSTEM_RESET,
};
use firmata_transport::SerialConfig;
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::board_type::BoardType;
use crate::error::{BoardError, Result};
use crate::events::{ChangeBus, ChangeEvent, SubscriptionId};
use crate::pin::{Pin, PinClass, PinId, PinMode, PinState, PinValue};
use crate::port::{Port, PortState};

/// Delay after opening the port before the first command.
///
/// Most boards reset when the port opens; commands sent before the
/// firmware is up lock the device.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(2);

/// Board construction options.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Display name. Defaults to the serial path when opened with an empty
    /// name.
    pub name: String,
    pub board_type: BoardType,
    pub startup_delay: Duration,
    pub codec: CodecConfig,
}

impl BoardConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_board_type(mut self, board_type: BoardType) -> Self {
        self.board_type = board_type;
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            board_type: BoardType::arduino(),
            startup_delay: DEFAULT_STARTUP_DELAY,
            codec: CodecConfig::default(),
        }
    }
}

type Writer = MessageWriter<Box<dyn Write + Send>>;
type Reader = MessageReader<Box<dyn Read + Send>>;

/// Write side handed to state mutations.
///
/// Each call locks the writer for exactly one message, so concurrent
/// callers never interleave bytes on the wire.
pub(crate) struct Outbound<'a> {
    writer: &'a Mutex<Writer>,
}

impl Outbound<'_> {
    pub(crate) fn command(&self, lead: u8, data: &[u8]) -> Result<()> {
        self.writer.lock().send_command(lead, data)?;
        Ok(())
    }

    pub(crate) fn channel(&self, command: u8, channel: u8, data: &[u8]) -> Result<()> {
        self.writer.lock().send_channel(command, channel, data)?;
        Ok(())
    }

    pub(crate) fn sysex(&self, command: u8, data: &[u8]) -> Result<()> {
        self.writer.lock().send_sysex(command, data)?;
        Ok(())
    }
}

/// Everything a message or a pin operation may mutate.
///
/// Guarded by one lock so a before/after event pair is never interleaved
/// with another thread's mutation.
pub(crate) struct BoardState {
    pub(crate) analog: Vec<PinState>,
    pub(crate) digital: Vec<PinState>,
    pub(crate) ports: Vec<PortState>,
    pub(crate) version: Option<(u8, u8)>,
    pub(crate) firmware: Option<String>,
    pub(crate) bus: ChangeBus,
}

impl BoardState {
    fn new(board_type: &BoardType) -> Self {
        let analog = (0..board_type.analog_pins)
            .map(|index| PinState::new(PinId::analog(index), PinMode::Input, false, None))
            .collect();

        let digital_pin = |index: u8, port: Option<u8>| {
            let mode = if board_type.is_disabled(index) {
                PinMode::Unavailable
            } else {
                PinMode::Output
            };
            PinState::new(
                PinId::digital(index),
                mode,
                board_type.is_pwm(index),
                port,
            )
        };

        let mut digital = Vec::with_capacity(usize::from(board_type.digital_slots()));
        let mut ports = Vec::with_capacity(usize::from(board_type.port_count()));
        if board_type.use_ports {
            for index in 0..board_type.port_count() {
                let port = PortState::new(index);
                digital.extend(port.pins.iter().map(|&pin| digital_pin(pin, Some(index))));
                ports.push(port);
            }
        } else {
            digital.extend((0..board_type.digital_pins).map(|pin| digital_pin(pin, None)));
        }

        Self {
            analog,
            digital,
            ports,
            version: None,
            firmware: None,
            bus: ChangeBus::new(),
        }
    }

    fn pins(&self, class: PinClass) -> &[PinState] {
        match class {
            PinClass::Analog => &self.analog,
            PinClass::Digital => &self.digital,
        }
    }

    pub(crate) fn pin(&self, id: PinId) -> Result<&PinState> {
        self.pins(id.class)
            .get(usize::from(id.index))
            .ok_or(BoardError::NoSuchPin(id))
    }

    pub(crate) fn pin_mut(&mut self, id: PinId) -> Result<&mut PinState> {
        let pins = match id.class {
            PinClass::Analog => &mut self.analog,
            PinClass::Digital => &mut self.digital,
        };
        pins.get_mut(usize::from(id.index))
            .ok_or(BoardError::NoSuchPin(id))
    }

    /// Pin state for an id already checked by [`Board::pin`].
    pub(crate) fn slot(&self, id: PinId) -> &PinState {
        &self.pins(id.class)[usize::from(id.index)]
    }
}

type Handler = fn(&mut BoardState, &[u8]) -> Result<()>;

/// Inbound commands the board understands. Everything else is discarded.
const HANDLERS: &[(u8, Handler)] = &[
    (ANALOG_MESSAGE, handle_analog_message),
    (DIGITAL_MESSAGE, handle_digital_message),
    (REPORT_VERSION, handle_report_version),
    (REPORT_FIRMWARE, handle_report_firmware),
];

fn find_handler(command: u8) -> Option<Handler> {
    HANDLERS
        .iter()
        .find(|(id, _)| *id == command)
        .map(|(_, handler)| *handler)
}

fn handle_analog_message(state: &mut BoardState, data: &[u8]) -> Result<()> {
    let &[pin, lsb, msb] = data else {
        return Err(malformed(ANALOG_MESSAGE, data));
    };
    let id = PinId::analog(pin);
    if !state.pin(id)?.reporting {
        return Ok(());
    }
    let value = normalize_analog(join_14bit(lsb, msb));
    state.set_value(id, Some(PinValue::Analog(value)))
}

fn handle_digital_message(state: &mut BoardState, data: &[u8]) -> Result<()> {
    let &[port, lsb, msb] = data else {
        return Err(malformed(DIGITAL_MESSAGE, data));
    };
    if usize::from(port) >= state.ports.len() {
        debug!(port, "digital message for unknown port");
        return Ok(());
    }
    state.update_port(port, join_14bit(lsb, msb))
}

fn handle_report_version(state: &mut BoardState, data: &[u8]) -> Result<()> {
    let &[major, minor] = data else {
        return Err(malformed(REPORT_VERSION, data));
    };
    state.version = Some((major, minor));
    Ok(())
}

fn handle_report_firmware(state: &mut BoardState, data: &[u8]) -> Result<()> {
    let [major, minor, name @ ..] = data else {
        return Err(malformed(REPORT_FIRMWARE, data));
    };
    state.version = Some((*major, *minor));
    state.firmware = Some(name.iter().map(|&b| char::from(b)).collect());
    Ok(())
}

fn malformed(command: u8, data: &[u8]) -> BoardError {
    BoardError::Malformed {
        command,
        len: data.len(),
    }
}

/// Scales a 10-bit reading to `0.0..=1.0`, rounded to 4 decimals.
fn normalize_analog(raw: u16) -> f64 {
    (f64::from(raw) / 1023.0 * 10_000.0).round() / 10_000.0
}

/// Encodes one SysEx payload value.
///
/// Values above 0x7F are shifted right by 7 rather than split, dropping the
/// low bits; the result is masked so it never becomes a status byte.
fn sysex_byte(value: u16) -> u8 {
    if value <= 0x7F {
        value as u8
    } else {
        ((value >> 7) & 0x7F) as u8
    }
}

/// A connected Firmata device.
///
/// Owns the pin and port mirror, the decode loop and the write side of the
/// transport. Share it across threads in an `Arc`; every method takes
/// `&self`.
pub struct Board {
    name: String,
    board_type: BoardType,
    state: Mutex<BoardState>,
    writer: Mutex<Writer>,
    reader: Mutex<Reader>,
    pub(crate) listening: AtomicBool,
    pub(crate) listener: Mutex<Option<JoinHandle<()>>>,
    pub(crate) error_count: AtomicU64,
}

impl Board {
    /// Opens a serial device and waits out the board's reset.
    pub fn open(serial: &SerialConfig, mut config: BoardConfig) -> Result<Self> {
        let stream = serial.open()?;
        let reader = stream.try_clone()?;
        if config.name.is_empty() {
            config.name = serial.path.clone();
        }
        info!(
            path = %serial.path,
            baud = serial.baud_rate,
            board_type = %config.board_type.name,
            "opened board"
        );

        let delay = config.startup_delay;
        let board = Self::from_parts(config, reader, stream)?;
        if !delay.is_zero() {
            debug!(?delay, "waiting for board startup");
            std::thread::sleep(delay);
        }
        Ok(board)
    }

    /// Builds a board over an already open transport.
    ///
    /// `reader` and `writer` are usually two handles on the same duplex
    /// stream. No startup delay is applied.
    pub fn from_parts<R, W>(config: BoardConfig, reader: R, writer: W) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        config.board_type.validate()?;
        let state = BoardState::new(&config.board_type);
        let reader: Box<dyn Read + Send> = Box::new(reader);
        let writer: Box<dyn Write + Send> = Box::new(writer);

        Ok(Self {
            name: config.name,
            board_type: config.board_type,
            state: Mutex::new(state),
            writer: Mutex::new(MessageWriter::new(writer)),
            reader: Mutex::new(MessageReader::with_config(reader, config.codec)),
            listening: AtomicBool::new(false),
            listener: Mutex::new(None),
            error_count: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn board_type(&self) -> &BoardType {
        &self.board_type
    }

    pub fn analog(&self, index: u8) -> Result<Pin<'_>> {
        self.pin(PinId::analog(index))
    }

    pub fn digital(&self, index: u8) -> Result<Pin<'_>> {
        self.pin(PinId::digital(index))
    }

    pub fn pin(&self, id: PinId) -> Result<Pin<'_>> {
        self.inspect(|state| state.pin(id).map(|_| ()))?;
        Ok(Pin::new(self, id))
    }

    pub fn port(&self, index: u8) -> Result<Port<'_>> {
        self.inspect(|state| state.port(index).map(|_| ()))?;
        Ok(Port::new(self, index))
    }

    pub fn analog_pins(&self) -> Vec<Pin<'_>> {
        (0..self.inspect(|state| state.analog.len()))
            .filter_map(|i| u8::try_from(i).ok())
            .map(|i| Pin::new(self, PinId::analog(i)))
            .collect()
    }

    /// All digital pins, including port padding beyond the board's range.
    pub fn digital_pins(&self) -> Vec<Pin<'_>> {
        (0..self.inspect(|state| state.digital.len()))
            .filter_map(|i| u8::try_from(i).ok())
            .map(|i| Pin::new(self, PinId::digital(i)))
            .collect()
    }

    pub fn ports(&self) -> Vec<Port<'_>> {
        (0..self.inspect(|state| state.ports.len()))
            .filter_map(|i| u8::try_from(i).ok())
            .map(|i| Port::new(self, i))
            .collect()
    }

    /// Copy of every pin's state, analog pins first.
    pub fn snapshot(&self) -> Vec<PinState> {
        self.inspect(|state| state.analog.iter().chain(&state.digital).cloned().collect())
    }

    /// Protocol version last reported by the device.
    pub fn firmata_version(&self) -> Option<(u8, u8)> {
        self.inspect(|state| state.version)
    }

    /// Firmware name last reported by the device.
    pub fn firmware(&self) -> Option<String> {
        self.inspect(|state| state.firmware.clone())
    }

    /// Reads one complete message from the device and applies it.
    ///
    /// Blocks until a message arrives or the transport's read timeout
    /// elapses. Messages without a handler are discarded.
    pub fn iterate(&self) -> Result<()> {
        let msg = self.reader.lock().read_message()?;
        match self.dispatch(&msg) {
            Err(BoardError::UnknownCommand(command)) => {
                debug!(
                    command,
                    name = command_name(command),
                    "discarding message without handler"
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Applies one decoded message to the board state.
    pub fn dispatch(&self, msg: &Message) -> Result<()> {
        let handler = find_handler(msg.command).ok_or(BoardError::UnknownCommand(msg.command))?;
        trace!(command = command_name(msg.command), len = msg.data.len(), "dispatch");
        let mut state = self.state.lock();
        handler(&mut state, &msg.data)
    }

    /// Writes one status byte and its data bytes.
    ///
    /// `lead` is the full status byte, e.g. `REPORT_ANALOG + pin`.
    pub fn write_command(&self, lead: u8, data: &[u8]) -> Result<()> {
        self.outbound().command(lead, data)
    }

    /// Writes a framed SysEx message.
    ///
    /// Values above 0x7F are not split into two bytes: they are shifted
    /// right by 7, losing their low bits.
    pub fn send_sysex(&self, command: u8, data: &[u16]) -> Result<()> {
        let payload: Vec<u8> = data.iter().map(|&v| sysex_byte(v)).collect();
        self.outbound().sysex(command, &payload)
    }

    /// Asks the device for its firmware name and version.
    pub fn query_firmware(&self) -> Result<()> {
        self.outbound().sysex(QUERY_FIRMWARE, &[])
    }

    /// Asks the device for its protocol version.
    pub fn query_version(&self) -> Result<()> {
        self.outbound().command(REPORT_VERSION, &[])
    }

    /// Sets how often the device samples and reports inputs.
    pub fn set_sampling_interval(&self, interval_ms: u16) -> Result<()> {
        self.outbound()
            .sysex(SAMPLING_INTERVAL, &split_14bit(interval_ms))
    }

    /// Sends SYSTEM_RESET. Local state is left as is.
    pub fn reset(&self) -> Result<()> {
        self.outbound().command(SYSTEM_RESET, &[])
    }

    /// Registers a callback for every pin change on this board.
    ///
    /// The callback runs with the board state locked and must not call
    /// back into the board.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        self.state.lock().bus.subscribe(handler)
    }

    /// Returns a receiver that gets a copy of every pin change.
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::Receiver<ChangeEvent>) {
        self.state.lock().bus.subscribe_channel()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.lock().bus.unsubscribe(id)
    }

    /// Number of failed listener iterations since the board was built.
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Stops listening and flushes pending output.
    pub fn close(&self) -> Result<()> {
        self.stop();
        self.writer.lock().flush()?;
        debug!(board = %self.name, "closed board");
        Ok(())
    }

    fn outbound(&self) -> Outbound<'_> {
        Outbound {
            writer: &self.writer,
        }
    }

    pub(crate) fn inspect<R>(&self, f: impl FnOnce(&BoardState) -> R) -> R {
        f(&self.state.lock())
    }

    pub(crate) fn inspect_mut<R>(&self, f: impl FnOnce(&mut BoardState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Runs a mutation with the state locked. The writer is locked per
    /// message inside, always after the state.
    pub(crate) fn modify<R>(
        &self,
        f: impl FnOnce(&mut BoardState, &Outbound<'_>) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.state.lock();
        f(&mut state, &self.outbound())
    }
}

impl Drop for Board {
    fn drop(&mut self) {
        self.listening.store(false, Ordering::Release);
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board {}", self.name)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("name", &self.name)
            .field("board_type", &self.board_type.name)
            .field("listening", &self.is_listening())
            .finish()
    }
}
