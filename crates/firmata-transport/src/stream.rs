use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::error::{Result, TransportError};

/// An open serial device: implements Read + Write.
///
/// Reads block for at most the configured read timeout and then fail with
/// `ErrorKind::TimedOut`. Use [`SerialStream::try_clone`] to hand one half to
/// a background reader while keeping the other for writes.
pub struct SerialStream {
    port: Box<dyn SerialPort>,
}

impl SerialStream {
    pub(crate) fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Device name as reported by the OS, if any.
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }

    /// Current read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.port.timeout()
    }

    /// Set the read timeout.
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(TransportError::Configure)
    }

    /// Try to clone this stream (duplicates the underlying handle).
    pub fn try_clone(&self) -> Result<Self> {
        let port = self.port.try_clone().map_err(TransportError::Configure)?;
        Ok(Self::from_port(port))
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("name", &self.port.name())
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}
