use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::command::{data_len, is_data_byte, END_SYSEX, START_SYSEX};
use crate::error::{CodecError, Result};

/// Default bound on buffered SysEx payload: 4 KiB.
pub const DEFAULT_MAX_SYSEX: usize = 4 * 1024;

/// The framing class of a command id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Status byte 0x80-0xEF; the channel is the first data element.
    Channel,
    /// Status byte 0xF0-0xFF other than the SysEx delimiters.
    Simple,
    /// SysEx command id 0x00-0x7F.
    Sysex,
}

impl MessageKind {
    /// Classify a command id.
    pub fn of(command: u8) -> Self {
        if is_data_byte(command) {
            MessageKind::Sysex
        } else if command < START_SYSEX {
            MessageKind::Channel
        } else {
            MessageKind::Simple
        }
    }
}

/// A decoded protocol message.
///
/// For channel commands `command` is the high nibble and the channel number
/// is prepended to `data`, so an analog report for pin 3 decodes as
/// `Message { command: 0xE0, data: [3, lsb, msb] }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Command id (masked status byte, simple status byte, or SysEx id).
    pub command: u8,
    /// Data bytes, channel first for channel commands.
    pub data: Bytes,
}

impl Message {
    /// Create a new message.
    pub fn new(command: u8, data: impl Into<Bytes>) -> Self {
        Self {
            command,
            data: data.into(),
        }
    }

    /// Framing class of this message.
    pub fn kind(&self) -> MessageKind {
        MessageKind::of(self.command)
    }

    /// Channel number for channel commands.
    pub fn channel(&self) -> Option<u8> {
        match self.kind() {
            MessageKind::Channel => self.data.first().copied(),
            _ => None,
        }
    }

    /// The total wire size of this message.
    pub fn wire_size(&self) -> usize {
        match self.kind() {
            MessageKind::Channel => self.data.len().max(1),
            MessageKind::Simple => 1 + self.data.len(),
            MessageKind::Sysex => 3 + self.data.len(),
        }
    }
}

/// Configuration for message decoding.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum buffered SysEx payload before the message is dropped.
    pub max_sysex_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_sysex_size: DEFAULT_MAX_SYSEX,
        }
    }
}

/// Split a 14-bit value into `(lsb, msb)` 7-bit bytes.
pub fn split_14bit(value: u16) -> [u8; 2] {
    [(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

/// Join 7-bit `lsb`/`msb` bytes into a 14-bit value.
pub fn join_14bit(lsb: u8, msb: u8) -> u16 {
    (u16::from(msb & 0x7F) << 7) | u16::from(lsb & 0x7F)
}

/// Encode a status byte followed by raw data bytes.
///
/// `lead` is the full status byte (`REPORT_ANALOG + pin`, `SET_PIN_MODE`, ...).
pub fn encode_command(lead: u8, data: &[u8], dst: &mut BytesMut) -> Result<()> {
    if is_data_byte(lead) {
        return Err(CodecError::InvalidLead { byte: lead });
    }
    check_data(data)?;
    dst.reserve(1 + data.len());
    dst.put_u8(lead);
    dst.put_slice(data);
    Ok(())
}

/// Encode a channel command: `command | channel`, then data.
pub fn encode_channel(command: u8, channel: u8, data: &[u8], dst: &mut BytesMut) -> Result<()> {
    if channel > 0x0F {
        return Err(CodecError::ChannelOutOfRange { channel });
    }
    encode_command((command & 0xF0) | channel, data, dst)
}

/// Encode a SysEx message.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬──────────────────┬────────────┐
/// │ START 0xF0 │ command    │ data (7-bit)*    │ END 0xF7   │
/// └────────────┴────────────┴──────────────────┴────────────┘
/// ```
pub fn encode_sysex(command: u8, data: &[u8], dst: &mut BytesMut) -> Result<()> {
    if !is_data_byte(command) {
        return Err(CodecError::DataByteOutOfRange { byte: command });
    }
    check_data(data)?;
    dst.reserve(3 + data.len());
    dst.put_u8(START_SYSEX);
    dst.put_u8(command);
    dst.put_slice(data);
    dst.put_u8(END_SYSEX);
    Ok(())
}

/// Encode a decoded message back into wire bytes (inverse of [`decode_message`]).
pub fn encode_message(msg: &Message, dst: &mut BytesMut) -> Result<()> {
    match msg.kind() {
        MessageKind::Channel => {
            let (&channel, rest) = msg
                .data
                .split_first()
                .ok_or(CodecError::MissingChannel {
                    command: msg.command,
                })?;
            encode_channel(msg.command, channel, rest, dst)
        }
        MessageKind::Simple => encode_command(msg.command, &msg.data, dst),
        MessageKind::Sysex => encode_sysex(msg.command, &msg.data, dst),
    }
}

fn check_data(data: &[u8]) -> Result<()> {
    match data.iter().find(|b| !is_data_byte(**b)) {
        Some(&byte) => Err(CodecError::DataByteOutOfRange { byte }),
        None => Ok(()),
    }
}

/// Decode one message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete message yet.
/// On success, consumes the message bytes from the buffer. Stray data bytes
/// in front of the next status byte are skipped.
///
/// Errors consume only the bytes that can never start a valid message, so
/// the caller may keep decoding from the same buffer afterwards.
pub fn decode_message(src: &mut BytesMut, max_sysex: usize) -> Result<Option<Message>> {
    let stray = src.iter().take_while(|b| is_data_byte(**b)).count();
    if stray > 0 {
        trace!(count = stray, "skipping stray data bytes");
        src.advance(stray);
    }

    let Some(&lead) = src.first() else {
        return Ok(None); // Need more data
    };

    match lead {
        START_SYSEX => decode_sysex(src, max_sysex),
        END_SYSEX => {
            src.advance(1);
            Err(CodecError::FramingDesync { lead })
        }
        _ if lead < START_SYSEX => {
            let command = lead & 0xF0;
            let Some(len) = data_len(command) else {
                src.advance(1);
                return Err(CodecError::FramingDesync { lead });
            };
            let Some(body) = take_data(src, command, len)? else {
                return Ok(None);
            };
            let mut data = BytesMut::with_capacity(1 + len);
            data.put_u8(lead & 0x0F);
            data.put_slice(&body);
            Ok(Some(Message {
                command,
                data: data.freeze(),
            }))
        }
        _ => {
            let Some(len) = data_len(lead) else {
                src.advance(1);
                return Err(CodecError::FramingDesync { lead });
            };
            Ok(take_data(src, lead, len)?.map(|data| Message {
                command: lead,
                data,
            }))
        }
    }
}

/// Take `len` data bytes following the status byte at `src[0]`.
fn take_data(src: &mut BytesMut, command: u8, len: usize) -> Result<Option<Bytes>> {
    if let Some(pos) = src[1..].iter().take(len).position(|b| !is_data_byte(*b)) {
        let byte = src[1 + pos];
        src.advance(1 + pos);
        return Err(CodecError::Interrupted { command, byte });
    }
    if src.len() < 1 + len {
        return Ok(None); // Need more data
    }
    src.advance(1);
    Ok(Some(src.split_to(len).freeze()))
}

fn decode_sysex(src: &mut BytesMut, max_sysex: usize) -> Result<Option<Message>> {
    let Some(end) = src[1..].iter().position(|b| !is_data_byte(*b)).map(|p| p + 1) else {
        let size = src.len().saturating_sub(2);
        if size > max_sysex {
            src.clear();
            return Err(CodecError::SysexTooLarge {
                size,
                max: max_sysex,
            });
        }
        return Ok(None); // Need more data
    };

    if src[end] != END_SYSEX {
        let byte = src[end];
        let command = if end > 1 { src[1] } else { START_SYSEX };
        src.advance(end);
        return Err(CodecError::Interrupted { command, byte });
    }

    if end == 1 {
        // START immediately followed by END: no command id to dispatch on.
        src.advance(2);
        return Err(CodecError::FramingDesync { lead: START_SYSEX });
    }

    let command = src[1];
    src.advance(2);
    let data = src.split_to(end - 2).freeze();
    src.advance(1);
    Ok(Some(Message { command, data }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::*;

    fn decode_all(bytes: &[u8]) -> Vec<Result<Option<Message>>> {
        let mut buf = BytesMut::from(bytes);
        let mut out = Vec::new();
        while !buf.is_empty() {
            let before = buf.len();
            let res = decode_message(&mut buf, DEFAULT_MAX_SYSEX);
            let done = matches!(res, Ok(None)) && buf.len() == before;
            out.push(res);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn analog_message_prepends_channel() {
        let mut buf = BytesMut::from(&[ANALOG_MESSAGE + 3, 127, 7][..]);
        let msg = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();

        assert_eq!(msg.command, ANALOG_MESSAGE);
        assert_eq!(msg.data.as_ref(), &[3, 127, 7]);
        assert_eq!(msg.channel(), Some(3));
        assert!(buf.is_empty());
    }

    #[test]
    fn report_version_is_simple() {
        let mut buf = BytesMut::from(&[REPORT_VERSION, 2, 1][..]);
        let msg = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();

        assert_eq!(msg.command, REPORT_VERSION);
        assert_eq!(msg.kind(), MessageKind::Simple);
        assert_eq!(msg.data.as_ref(), &[2, 1]);
    }

    #[test]
    fn sysex_payload_excludes_delimiters() {
        let mut buf = BytesMut::from(&[START_SYSEX, REPORT_FIRMWARE, 2, 1, b'a', b'b', END_SYSEX][..]);
        let msg = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();

        assert_eq!(msg.command, REPORT_FIRMWARE);
        assert_eq!(msg.kind(), MessageKind::Sysex);
        assert_eq!(msg.data.as_ref(), &[2, 1, b'a', b'b']);
        assert!(buf.is_empty());
    }

    #[test]
    fn unknown_sysex_still_framed() {
        let mut buf = BytesMut::from(&[START_SYSEX, 0x05, 1, 2, END_SYSEX, REPORT_VERSION, 2, 1][..]);
        let msg = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();
        assert_eq!(msg.command, 0x05);

        let next = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();
        assert_eq!(next.command, REPORT_VERSION);
    }

    #[test]
    fn incomplete_channel_message() {
        let mut buf = BytesMut::from(&[ANALOG_MESSAGE + 1, 5][..]);
        assert!(decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().is_none());
        assert_eq!(buf.len(), 2);

        buf.put_u8(1);
        let msg = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();
        assert_eq!(msg.data.as_ref(), &[1, 5, 1]);
    }

    #[test]
    fn incomplete_sysex() {
        let mut buf = BytesMut::from(&[START_SYSEX, REPORT_FIRMWARE, 2][..]);
        assert!(decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn stray_data_bytes_are_skipped() {
        let mut wire = (0u8..=10).collect::<Vec<_>>();
        wire.extend_from_slice(&[ANALOG_MESSAGE + 4, 127, 7]);
        wire.extend(0u8..=10);

        let results = decode_all(&wire);
        let messages: Vec<_> = results
            .into_iter()
            .filter_map(|r| r.unwrap())
            .collect();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data.as_ref(), &[4, 127, 7]);
    }

    #[test]
    fn unknown_channel_command_desyncs_one_byte() {
        let mut buf = BytesMut::from(&[0xA2, 10, 20, REPORT_VERSION, 2, 3][..]);
        let err = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap_err();
        assert!(matches!(err, CodecError::FramingDesync { lead: 0xA2 }));
        assert!(err.is_recoverable());

        let msg = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();
        assert_eq!(msg.command, REPORT_VERSION);
        assert_eq!(msg.data.as_ref(), &[2, 3]);
    }

    #[test]
    fn stray_end_sysex_desyncs() {
        let mut buf = BytesMut::from(&[END_SYSEX][..]);
        let err = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap_err();
        assert!(matches!(err, CodecError::FramingDesync { lead: END_SYSEX }));
        assert!(buf.is_empty());
    }

    #[test]
    fn status_byte_interrupts_fixed_read() {
        let mut buf = BytesMut::from(&[ANALOG_MESSAGE + 2, 5, REPORT_VERSION, 2, 1][..]);
        let err = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Interrupted {
                command: ANALOG_MESSAGE,
                byte: REPORT_VERSION
            }
        ));

        let msg = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();
        assert_eq!(msg.command, REPORT_VERSION);
    }

    #[test]
    fn status_byte_interrupts_sysex() {
        let mut buf = BytesMut::from(&[START_SYSEX, REPORT_FIRMWARE, 2, ANALOG_MESSAGE, 1, 2][..]);
        let err = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap_err();
        assert!(matches!(err, CodecError::Interrupted { command: REPORT_FIRMWARE, .. }));

        let msg = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();
        assert_eq!(msg.data.as_ref(), &[0, 1, 2]);
    }

    #[test]
    fn empty_sysex_has_no_command() {
        let mut buf = BytesMut::from(&[START_SYSEX, END_SYSEX][..]);
        let err = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap_err();
        assert!(matches!(err, CodecError::FramingDesync { lead: START_SYSEX }));
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_sysex_is_dropped() {
        let mut buf = BytesMut::new();
        buf.put_u8(START_SYSEX);
        buf.put_u8(STRING_DATA);
        buf.put_slice(&[0x41; 32]);

        let err = decode_message(&mut buf, 16).unwrap_err();
        assert!(matches!(err, CodecError::SysexTooLarge { size: 32, max: 16 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn system_reset_has_no_data() {
        let mut buf = BytesMut::from(&[SYSTEM_RESET][..]);
        let msg = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();
        assert_eq!(msg.command, SYSTEM_RESET);
        assert!(msg.data.is_empty());
    }

    #[test]
    fn encode_sysex_wraps_payload() {
        let mut buf = BytesMut::new();
        encode_sysex(REPORT_FIRMWARE, &[1, 2, 3], &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0xF0, 0x79, 1, 2, 3, 0xF7]);
    }

    #[test]
    fn encode_rejects_wide_data() {
        let mut buf = BytesMut::new();
        let err = encode_command(SET_PIN_MODE, &[13, 0x80], &mut buf).unwrap_err();
        assert!(matches!(err, CodecError::DataByteOutOfRange { byte: 0x80 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_rejects_data_byte_as_lead() {
        let mut buf = BytesMut::new();
        let err = encode_command(0x10, &[], &mut buf).unwrap_err();
        assert!(matches!(err, CodecError::InvalidLead { byte: 0x10 }));
    }

    #[test]
    fn encode_channel_checks_nibble() {
        let mut buf = BytesMut::new();
        encode_channel(REPORT_DIGITAL, 1, &[1], &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0xD1, 1]);

        let err = encode_channel(ANALOG_MESSAGE, 16, &[0, 0], &mut buf).unwrap_err();
        assert!(matches!(err, CodecError::ChannelOutOfRange { channel: 16 }));
    }

    #[test]
    fn encode_message_inverts_decode() {
        let wire = [DIGITAL_MESSAGE + 1, 0x20, 0x01];
        let mut buf = BytesMut::from(&wire[..]);
        let msg = decode_message(&mut buf, DEFAULT_MAX_SYSEX).unwrap().unwrap();

        let mut out = BytesMut::new();
        encode_message(&msg, &mut out).unwrap();
        assert_eq!(out.as_ref(), &wire);
        assert_eq!(msg.wire_size(), wire.len());
    }

    #[test]
    fn encode_channel_message_without_channel() {
        let mut out = BytesMut::new();
        let err = encode_message(&Message::new(ANALOG_MESSAGE, Bytes::new()), &mut out).unwrap_err();
        assert!(matches!(err, CodecError::MissingChannel { command: ANALOG_MESSAGE }));
    }

    #[test]
    fn fourteen_bit_helpers() {
        assert_eq!(split_14bit(1023), [127, 7]);
        assert_eq!(join_14bit(127, 7), 1023);
        assert_eq!(split_14bit(0x3FFF), [0x7F, 0x7F]);
    }
}
