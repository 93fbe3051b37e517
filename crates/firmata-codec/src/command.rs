//! Command bytes and the static command-length table.
//!
//! Values 0x80-0xFF are status bytes. Channel commands (0x80-0xEF) carry a
//! pin or port number in their low nibble. SysEx command ids live in
//! 0x00-0x7F and only ever appear after [`START_SYSEX`].

/// Protocol version this codec speaks, as sent in REPORT_VERSION.
pub const PROTOCOL_MAJOR_VERSION: u8 = 2;
pub const PROTOCOL_MINOR_VERSION: u8 = 1;

/// Send data for a digital port (8 pins).
pub const DIGITAL_MESSAGE: u8 = 0x90;
/// Send data for an analog pin (or PWM).
pub const ANALOG_MESSAGE: u8 = 0xE0;
/// Enable analog input by pin number.
pub const REPORT_ANALOG: u8 = 0xC0;
/// Enable digital input by port.
pub const REPORT_DIGITAL: u8 = 0xD0;

/// Start a SysEx message.
pub const START_SYSEX: u8 = 0xF0;
/// Set a pin to INPUT/OUTPUT/PWM/etc.
pub const SET_PIN_MODE: u8 = 0xF4;
/// Set the value of a single digital pin.
pub const SET_DIGITAL_PIN_VALUE: u8 = 0xF5;
/// End a SysEx message.
pub const END_SYSEX: u8 = 0xF7;
/// Report (or query) the protocol version.
pub const REPORT_VERSION: u8 = 0xF9;
/// Reset the board.
pub const SYSTEM_RESET: u8 = 0xFF;

// Extended command set using SysEx (0x00-0x7F).

/// Set max angle, minPulse, maxPulse, freq.
pub const SERVO_CONFIG: u8 = 0x70;
/// A string message with 14 bits per char.
pub const STRING_DATA: u8 = 0x71;
/// A bitstream to/from a shift register.
pub const SHIFT_DATA: u8 = 0x75;
/// Send an I2C read/write request.
pub const I2C_REQUEST: u8 = 0x76;
/// A reply to an I2C read request.
pub const I2C_REPLY: u8 = 0x77;
/// Config I2C settings such as delay times and power pins.
pub const I2C_CONFIG: u8 = 0x78;
/// Report name and version of the firmware.
pub const REPORT_FIRMWARE: u8 = 0x79;
/// Query the firmware name (same id as the report).
pub const QUERY_FIRMWARE: u8 = REPORT_FIRMWARE;
/// Set the poll rate of the main loop.
pub const SAMPLING_INTERVAL: u8 = 0x7A;
/// MIDI reserved for non-realtime messages.
pub const SYSEX_NON_REALTIME: u8 = 0x7E;
/// MIDI reserved for realtime messages.
pub const SYSEX_REALTIME: u8 = 0x7F;

/// Inbound data-byte counts for every non-SysEx command this crate frames.
///
/// Channel commands are keyed by their high nibble.
const COMMAND_TABLE: &[(u8, usize)] = &[
    (DIGITAL_MESSAGE, 2),
    (REPORT_ANALOG, 1),
    (REPORT_DIGITAL, 1),
    (ANALOG_MESSAGE, 2),
    (SET_PIN_MODE, 2),
    (SET_DIGITAL_PIN_VALUE, 2),
    (REPORT_VERSION, 2),
    (SYSTEM_RESET, 0),
];

/// Number of data bytes following `command`, or `None` if the command is
/// not in the table.
///
/// For channel commands pass the high nibble (`lead & 0xF0`).
pub fn data_len(command: u8) -> Option<usize> {
    COMMAND_TABLE
        .iter()
        .find(|(id, _)| *id == command)
        .map(|(_, len)| *len)
}

/// Returns true for status bytes that address a channel (0x80-0xEF).
pub fn is_channel_command(byte: u8) -> bool {
    (0x80..START_SYSEX).contains(&byte)
}

/// Returns true for 7-bit data bytes.
pub fn is_data_byte(byte: u8) -> bool {
    byte < 0x80
}

/// Returns a human-readable name for a command id.
///
/// Ids below 0x80 are looked up as SysEx commands.
pub fn command_name(command: u8) -> &'static str {
    match command {
        DIGITAL_MESSAGE => "DIGITAL_MESSAGE",
        ANALOG_MESSAGE => "ANALOG_MESSAGE",
        REPORT_ANALOG => "REPORT_ANALOG",
        REPORT_DIGITAL => "REPORT_DIGITAL",
        START_SYSEX => "START_SYSEX",
        SET_PIN_MODE => "SET_PIN_MODE",
        SET_DIGITAL_PIN_VALUE => "SET_DIGITAL_PIN_VALUE",
        END_SYSEX => "END_SYSEX",
        REPORT_VERSION => "REPORT_VERSION",
        SYSTEM_RESET => "SYSTEM_RESET",
        SERVO_CONFIG => "SERVO_CONFIG",
        STRING_DATA => "STRING_DATA",
        SHIFT_DATA => "SHIFT_DATA",
        I2C_REQUEST => "I2C_REQUEST",
        I2C_REPLY => "I2C_REPLY",
        I2C_CONFIG => "I2C_CONFIG",
        REPORT_FIRMWARE => "REPORT_FIRMWARE",
        SAMPLING_INTERVAL => "SAMPLING_INTERVAL",
        SYSEX_NON_REALTIME => "SYSEX_NON_REALTIME",
        SYSEX_REALTIME => "SYSEX_REALTIME",
        0x00..=0x0F => "USER_SYSEX",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lengths() {
        assert_eq!(data_len(DIGITAL_MESSAGE), Some(2));
        assert_eq!(data_len(ANALOG_MESSAGE), Some(2));
        assert_eq!(data_len(REPORT_ANALOG), Some(1));
        assert_eq!(data_len(REPORT_VERSION), Some(2));
        assert_eq!(data_len(SYSTEM_RESET), Some(0));
    }

    #[test]
    fn unknown_commands_have_no_length() {
        assert_eq!(data_len(0xA0), None);
        assert_eq!(data_len(0xB0), None);
        assert_eq!(data_len(0xF1), None);
        // Channel commands are keyed by nibble, never by the full lead byte.
        assert_eq!(data_len(0xE3), None);
    }

    #[test]
    fn channel_range() {
        assert!(is_channel_command(0x80));
        assert!(is_channel_command(0xEF));
        assert!(!is_channel_command(START_SYSEX));
        assert!(!is_channel_command(0x7F));
    }

    #[test]
    fn names() {
        assert_eq!(command_name(REPORT_FIRMWARE), "REPORT_FIRMWARE");
        assert_eq!(command_name(0x05), "USER_SYSEX");
        assert_eq!(command_name(0xA0), "UNKNOWN");
    }
}
