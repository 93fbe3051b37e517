//! Per-pin state machine and single-pin wire encoding.

use std::fmt;
use std::str::FromStr;

use firmata_codec::{ANALOG_MESSAGE, DIGITAL_MESSAGE, REPORT_ANALOG, SET_PIN_MODE};
use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardState, Outbound};
use crate::error::{BoardError, Result};
use crate::events::{Change, ChangeEvent};

/// Whether a pin sits on the analog or the digital header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinClass {
    Analog,
    Digital,
}

impl fmt::Display for PinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinClass::Analog => f.write_str("Analog"),
            PinClass::Digital => f.write_str("Digital"),
        }
    }
}

/// Addresses one pin of a board: its class plus its index within the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinId {
    pub class: PinClass,
    pub index: u8,
}

impl PinId {
    pub const fn analog(index: u8) -> Self {
        Self {
            class: PinClass::Analog,
            index,
        }
    }

    pub const fn digital(index: u8) -> Self {
        Self {
            class: PinClass::Digital,
            index,
        }
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pin {}", self.class, self.index)
    }
}

/// Parses `a3`/`A3` as analog pin 3 and `d13`/`13` as digital pin 13.
impl FromStr for PinId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (class, digits) = match s.chars().next() {
            Some('a' | 'A') => (PinClass::Analog, &s[1..]),
            Some('d' | 'D') => (PinClass::Digital, &s[1..]),
            _ => (PinClass::Digital, s),
        };
        let index = digits
            .parse::<u8>()
            .map_err(|_| format!("invalid pin '{s}' (expected e.g. a0, d13 or 13)"))?;
        Ok(Self { class, index })
    }
}

/// Operating mode of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PinMode {
    /// Reserved by the board (Rx/Tx, crystal) or outside its range.
    Unavailable,
    Input,
    Output,
    Analog,
    Pwm,
}

impl PinMode {
    /// Mode byte sent with SET_PIN_MODE. `None` for UNAVAILABLE, which
    /// exists only on the host side.
    pub fn wire_value(self) -> Option<u8> {
        match self {
            PinMode::Unavailable => None,
            PinMode::Input => Some(0),
            PinMode::Output => Some(1),
            PinMode::Analog => Some(2),
            PinMode::Pwm => Some(3),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PinMode::Unavailable => "UNAVAILABLE",
            PinMode::Input => "INPUT",
            PinMode::Output => "OUTPUT",
            PinMode::Analog => "ANALOG",
            PinMode::Pwm => "PWM",
        }
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PinMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unavailable" => Ok(PinMode::Unavailable),
            "input" => Ok(PinMode::Input),
            "output" => Ok(PinMode::Output),
            "analog" => Ok(PinMode::Analog),
            "pwm" => Ok(PinMode::Pwm),
            other => Err(format!(
                "unknown pin mode '{other}' (expected input, output, analog or pwm)"
            )),
        }
    }
}

/// Last known reading or written level of a pin.
///
/// Digital pins carry a level; analog inputs and PWM outputs carry a
/// fraction in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinValue {
    Digital(bool),
    Analog(f64),
}

impl PinValue {
    /// Digital interpretation: any non-zero fraction is high.
    pub fn is_high(self) -> bool {
        match self {
            PinValue::Digital(level) => level,
            PinValue::Analog(v) => v != 0.0,
        }
    }

    /// Fractional interpretation: a high level is 1.0.
    pub fn as_f64(self) -> f64 {
        match self {
            PinValue::Digital(true) => 1.0,
            PinValue::Digital(false) => 0.0,
            PinValue::Analog(v) => v,
        }
    }
}

impl From<bool> for PinValue {
    fn from(level: bool) -> Self {
        PinValue::Digital(level)
    }
}

impl From<f64> for PinValue {
    fn from(v: f64) -> Self {
        PinValue::Analog(v)
    }
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinValue::Digital(true) => f.write_str("HIGH"),
            PinValue::Digital(false) => f.write_str("LOW"),
            PinValue::Analog(v) => write!(f, "{v:.4}"),
        }
    }
}

/// Parses `high`/`low`/`true`/`false`/`on`/`off` as levels, anything else
/// as a fraction.
impl FromStr for PinValue {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" | "true" | "on" => Ok(PinValue::Digital(true)),
            "low" | "false" | "off" => Ok(PinValue::Digital(false)),
            other => other
                .parse::<f64>()
                .map(PinValue::Analog)
                .map_err(|_| format!("invalid pin value '{s}' (expected high, low or 0.0-1.0)")),
        }
    }
}

/// Snapshot of one pin's mirrored state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinState {
    pub id: PinId,
    /// Owning digital port, if the board groups pins into ports.
    pub port: Option<u8>,
    pub mode: PinMode,
    /// Fixed at construction from the board type.
    pub pwm: bool,
    pub reporting: bool,
    pub value: Option<PinValue>,
}

impl PinState {
    pub(crate) fn new(id: PinId, mode: PinMode, pwm: bool, port: Option<u8>) -> Self {
        Self {
            id,
            port,
            mode,
            pwm,
            reporting: false,
            value: None,
        }
    }
}

impl BoardState {
    pub(crate) fn set_mode(&mut self, id: PinId, mode: PinMode, out: &Outbound<'_>) -> Result<()> {
        let pin = self.pin(id)?;
        let from = pin.mode;
        if from == mode {
            return Ok(());
        }
        if mode == PinMode::Pwm && !pin.pwm {
            return Err(BoardError::InvalidMode {
                pin: id,
                mode,
                reason: "pin does not have PWM capabilities",
            });
        }
        if from == PinMode::Unavailable {
            return Err(BoardError::InvalidMode {
                pin: id,
                mode,
                reason: "pin cannot be used through Firmata",
            });
        }

        let change = Change::PinMode { from, to: mode };
        self.bus.emit(&ChangeEvent::before(id, change));
        self.pin_mut(id)?.mode = mode;
        let result = match mode.wire_value() {
            Some(wire) => out
                .command(SET_PIN_MODE, &[id.index, wire])
                .and_then(|()| {
                    if mode == PinMode::Input {
                        self.enable_reporting(id, out)
                    } else {
                        Ok(())
                    }
                }),
            None => Ok(()),
        };
        self.bus.emit(&ChangeEvent::after(id, change));
        result
    }

    pub(crate) fn set_reporting(&mut self, id: PinId, reporting: bool) -> Result<()> {
        let from = self.pin(id)?.reporting;
        if from == reporting {
            return Ok(());
        }
        let change = Change::Reporting {
            from,
            to: reporting,
        };
        self.bus.emit(&ChangeEvent::before(id, change));
        self.pin_mut(id)?.reporting = reporting;
        self.bus.emit(&ChangeEvent::after(id, change));
        Ok(())
    }

    pub(crate) fn set_value(&mut self, id: PinId, value: Option<PinValue>) -> Result<()> {
        let from = self.pin(id)?.value;
        if from == value {
            return Ok(());
        }
        let change = Change::Value { from, to: value };
        self.bus.emit(&ChangeEvent::before(id, change));
        self.pin_mut(id)?.value = value;
        self.bus.emit(&ChangeEvent::after(id, change));
        Ok(())
    }

    pub(crate) fn enable_reporting(&mut self, id: PinId, out: &Outbound<'_>) -> Result<()> {
        let pin = self.pin(id)?;
        if pin.mode != PinMode::Input {
            return Err(BoardError::NotReportable(id));
        }
        match (id.class, pin.port) {
            (PinClass::Analog, _) => {
                self.set_reporting(id, true)?;
                out.channel(REPORT_ANALOG, id.index, &[1])
            }
            (PinClass::Digital, Some(port)) => self.enable_port_reporting(port, out),
            (PinClass::Digital, None) => Ok(()),
        }
    }

    pub(crate) fn disable_reporting(&mut self, id: PinId, out: &Outbound<'_>) -> Result<()> {
        let pin = self.pin(id)?;
        match (id.class, pin.port) {
            (PinClass::Analog, _) => {
                self.set_reporting(id, false)?;
                out.channel(REPORT_ANALOG, id.index, &[0])
            }
            (PinClass::Digital, Some(port)) => self.disable_port_reporting(port, out),
            (PinClass::Digital, None) => Ok(()),
        }
    }

    pub(crate) fn read(&self, id: PinId) -> Result<Option<PinValue>> {
        let pin = self.pin(id)?;
        if pin.mode == PinMode::Unavailable {
            return Err(BoardError::Unavailable(id));
        }
        Ok(pin.value)
    }

    pub(crate) fn write(&mut self, id: PinId, value: PinValue, out: &Outbound<'_>) -> Result<()> {
        let pin = self.pin(id)?;
        let (mode, port) = (pin.mode, pin.port);
        match mode {
            PinMode::Unavailable => return Err(BoardError::Unavailable(id)),
            PinMode::Input => return Err(BoardError::NotWritable(id)),
            _ => {}
        }

        let stored = match mode {
            PinMode::Output => PinValue::Digital(value.is_high()),
            PinMode::Pwm => PinValue::Analog(value.as_f64().clamp(0.0, 1.0)),
            _ => value,
        };
        if pin.value == Some(stored) {
            return Ok(());
        }

        // The mirror only takes the value once the device has been told.
        match (mode, port) {
            (PinMode::Output, Some(port)) => {
                self.send_port(port, Some((id.index, stored.is_high())), out)?;
            }
            (PinMode::Output, None) => {
                out.command(DIGITAL_MESSAGE, &[id.index, u8::from(stored.is_high())])?;
            }
            (PinMode::Pwm, _) => {
                let duty = pwm_duty(stored.as_f64());
                out.channel(ANALOG_MESSAGE, id.index, &[duty % 128, duty >> 7])?;
            }
            _ => {}
        }
        self.set_value(id, Some(stored))
    }
}

/// Scales a `0.0..=1.0` fraction to the 8-bit PWM duty cycle.
fn pwm_duty(fraction: f64) -> u8 {
    (fraction * 255.0).clamp(0.0, 255.0) as u8
}

/// Handle to one pin of a [`Board`].
///
/// Handles are cheap to create and hold only the pin's id; all state lives
/// in the board behind its lock.
#[derive(Clone, Copy)]
pub struct Pin<'a> {
    board: &'a Board,
    id: PinId,
}

impl<'a> Pin<'a> {
    pub(crate) fn new(board: &'a Board, id: PinId) -> Self {
        Self { board, id }
    }

    pub fn id(&self) -> PinId {
        self.id
    }

    pub fn index(&self) -> u8 {
        self.id.index
    }

    pub fn class(&self) -> PinClass {
        self.id.class
    }

    /// Copy of the pin's current state.
    pub fn state(&self) -> PinState {
        self.board.inspect(|state| state.slot(self.id).clone())
    }

    pub fn mode(&self) -> PinMode {
        self.board.inspect(|state| state.slot(self.id).mode)
    }

    pub fn is_pwm_capable(&self) -> bool {
        self.board.inspect(|state| state.slot(self.id).pwm)
    }

    pub fn reporting(&self) -> bool {
        self.board.inspect(|state| state.slot(self.id).reporting)
    }

    /// Last value without the availability check of [`Pin::read`].
    pub fn value(&self) -> Option<PinValue> {
        self.board.inspect(|state| state.slot(self.id).value)
    }

    /// Owning digital port index.
    pub fn port(&self) -> Option<u8> {
        self.board.inspect(|state| state.slot(self.id).port)
    }

    /// Changes the pin mode and tells the device.
    ///
    /// Switching to INPUT also enables reporting. Fails with
    /// [`BoardError::InvalidMode`] for PWM on a pin without PWM support and
    /// for any change away from UNAVAILABLE.
    pub fn set_mode(&self, mode: PinMode) -> Result<()> {
        self.board
            .modify(|state, out| state.set_mode(self.id, mode, out))
    }

    /// Sets the local reporting flag only.
    pub fn set_reporting(&self, reporting: bool) -> Result<()> {
        self.board
            .modify(|state, _| state.set_reporting(self.id, reporting))
    }

    /// Sets the mirrored value without touching the device.
    pub fn set_value(&self, value: Option<PinValue>) -> Result<()> {
        self.board.modify(|state, _| state.set_value(self.id, value))
    }

    /// Asks the device to report this pin (or its whole port).
    pub fn enable_reporting(&self) -> Result<()> {
        self.board
            .modify(|state, out| state.enable_reporting(self.id, out))
    }

    pub fn disable_reporting(&self) -> Result<()> {
        self.board
            .modify(|state, out| state.disable_reporting(self.id, out))
    }

    /// Last value received from or written to the device.
    pub fn read(&self) -> Result<Option<PinValue>> {
        self.board.inspect(|state| state.read(self.id))
    }

    /// Drives an OUTPUT or PWM pin.
    ///
    /// OUTPUT pins take the value as a level; PWM pins take a fraction in
    /// `0.0..=1.0`. Writing the current value sends nothing.
    pub fn write(&self, value: impl Into<PinValue>) -> Result<()> {
        let value = value.into();
        self.board
            .modify(|state, out| state.write(self.id, value, out))
    }
}

impl fmt::Display for Pin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

impl fmt::Debug for Pin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pin").field("id", &self.id).finish()
    }
}
