use std::io::{self, ErrorKind, Write};

use bytes::{Buf, BytesMut};

use crate::codec::{encode_channel, encode_command, encode_message, encode_sysex, Message};
use crate::error::{CodecError, Result};

/// Writes complete messages to any `Write` stream.
///
/// Every call encodes one whole message and writes it before returning, so
/// a writer guarded by a mutex never interleaves two messages on the wire.
/// Nothing is written when encoding fails.
pub struct MessageWriter<T> {
    inner: T,
    pending: BytesMut,
}

impl<T: Write> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            pending: BytesMut::with_capacity(32),
        }
    }

    /// Write a status byte and its data bytes.
    pub fn send_command(&mut self, lead: u8, data: &[u8]) -> Result<()> {
        self.pending.clear();
        encode_command(lead, data, &mut self.pending)?;
        self.drain()
    }

    /// Write a channel command addressed to `channel`.
    pub fn send_channel(&mut self, command: u8, channel: u8, data: &[u8]) -> Result<()> {
        self.pending.clear();
        encode_channel(command, channel, data, &mut self.pending)?;
        self.drain()
    }

    /// Write a framed SysEx message.
    pub fn send_sysex(&mut self, command: u8, data: &[u8]) -> Result<()> {
        self.pending.clear();
        encode_sysex(command, data, &mut self.pending)?;
        self.drain()
    }

    /// Write a previously decoded or constructed message.
    pub fn write_message(&mut self, msg: &Message) -> Result<()> {
        self.pending.clear();
        encode_message(msg, &mut self.pending)?;
        self.drain()
    }

    /// Push the encoded bytes out and flush, retrying on transient errors.
    ///
    /// Serial drivers report a full output buffer as `WouldBlock`.
    fn drain(&mut self) -> Result<()> {
        while self.pending.has_remaining() {
            match self.inner.write(&self.pending) {
                Ok(0) => return Err(CodecError::ConnectionClosed),
                Ok(n) => self.pending.advance(n),
                Err(err) if retryable(&err) => {}
                Err(err) => return Err(err.into()),
            }
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if retryable(&err) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn retryable(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;

    use super::*;
    use crate::command::*;
    use crate::reader::MessageReader;

    /// Test double for a serial port: each write or flush pops the next scripted
    /// outcome, and accepts everything once the script runs out.
    #[derive(Default)]
    struct ScriptedPort {
        writes: VecDeque<io::Result<usize>>,
        flushes: VecDeque<io::Result<()>>,
        wire: Vec<u8>,
        flush_count: usize,
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = match self.writes.pop_front() {
                Some(Ok(n)) => n.min(buf.len()),
                Some(Err(err)) => return Err(err),
                None => buf.len(),
            };
            self.wire.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flush_count += 1;
            self.flushes.pop_front().unwrap_or(Ok(()))
        }
    }

    #[test]
    fn set_pin_mode_is_three_bytes() {
        let mut writer = MessageWriter::new(ScriptedPort::default());
        writer.send_command(SET_PIN_MODE, &[13, 1]).unwrap();

        let port = writer.into_inner();
        assert_eq!(port.wire, vec![0xF4, 13, 1]);
        assert_eq!(port.flush_count, 1);
    }

    #[test]
    fn report_analog_then_firmware_query() {
        let mut writer = MessageWriter::new(ScriptedPort::default());
        writer.send_channel(REPORT_ANALOG, 4, &[1]).unwrap();
        writer.send_sysex(QUERY_FIRMWARE, &[]).unwrap();

        assert_eq!(writer.into_inner().wire, vec![0xC4, 1, 0xF0, 0x79, 0xF7]);
    }

    #[test]
    fn rejected_payload_never_reaches_the_port() {
        let mut writer = MessageWriter::new(ScriptedPort::default());
        let err = writer.send_sysex(STRING_DATA, &[0x41, 0xC8]).unwrap_err();

        assert!(matches!(err, CodecError::DataByteOutOfRange { byte: 0xC8 }));
        let port = writer.into_inner();
        assert!(port.wire.is_empty());
        assert_eq!(port.flush_count, 0);
    }

    #[test]
    fn decoded_report_can_be_replayed() {
        let report = Message::new(ANALOG_MESSAGE, vec![5, 0x7F, 0x01]);
        let mut writer = MessageWriter::new(Cursor::new(Vec::new()));
        writer.write_message(&report).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, vec![0xE5, 0x7F, 0x01]);
        let mut reader = MessageReader::new(Cursor::new(wire));
        assert_eq!(reader.read_message().unwrap(), report);
    }

    #[test]
    fn short_writes_and_busy_driver_are_retried() {
        let port = ScriptedPort {
            writes: VecDeque::from([
                Err(io::Error::from(ErrorKind::WouldBlock)),
                Ok(2),
                Err(io::Error::from(ErrorKind::Interrupted)),
            ]),
            flushes: VecDeque::from([Err(io::Error::from(ErrorKind::Interrupted))]),
            ..ScriptedPort::default()
        };
        let mut writer = MessageWriter::new(port);
        writer.send_sysex(SAMPLING_INTERVAL, &[0x13, 0x00]).unwrap();

        let port = writer.into_inner();
        assert_eq!(port.wire, vec![0xF0, 0x7A, 0x13, 0x00, 0xF7]);
        assert_eq!(port.flush_count, 2);
    }

    #[test]
    fn zero_length_write_means_unplugged() {
        let port = ScriptedPort {
            writes: VecDeque::from([Ok(0)]),
            ..ScriptedPort::default()
        };
        let mut writer = MessageWriter::new(port);
        let err = writer.send_command(SYSTEM_RESET, &[]).unwrap_err();
        assert!(matches!(err, CodecError::ConnectionClosed));
    }

    #[test]
    fn hard_io_error_is_reported() {
        let port = ScriptedPort {
            writes: VecDeque::from([Err(io::Error::from(ErrorKind::BrokenPipe))]),
            ..ScriptedPort::default()
        };
        let mut writer = MessageWriter::new(port);
        let err = writer.send_command(REPORT_VERSION, &[]).unwrap_err();
        assert!(matches!(err, CodecError::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
    }
}
