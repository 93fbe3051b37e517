use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::SerialStream;

/// Default link speed for StandardFirmata sketches.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Default device path on Linux hosts.
pub const DEFAULT_PATH: &str = "/dev/ttyUSB0";

/// Serial link settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyACM0`, `COM3`, ...).
    pub path: String,
    /// Baud rate. Default: 57600.
    pub baud_rate: u32,
    /// Data bits per character. Default: 8.
    pub data_bits: DataBits,
    /// Stop bits. Default: 1.
    pub stop_bits: StopBits,
    /// Parity. Default: none.
    pub parity: Parity,
    /// How long a read may block before returning `TimedOut`.
    ///
    /// Readers treat a timeout as "no data yet"; the bound only exists so a
    /// background reader can notice it was asked to stop.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Settings for `path` with every other field at its default.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Override the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Open the device described by this configuration.
    pub fn open(&self) -> Result<SerialStream> {
        debug!(path = %self.path, baud = self.baud_rate, "opening serial port");
        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(self.data_bits)
            .stop_bits(self.stop_bits)
            .parity(self.parity)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: self.path.clone(),
                source,
            })?;
        info!(path = %self.path, baud = self.baud_rate, "serial port open");
        Ok(SerialStream::from_port(port))
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_PATH.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// A serial device visible to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path.
    pub path: String,
    /// Transport kind: `usb`, `bluetooth`, `pci` or `unknown`.
    pub kind: &'static str,
    /// USB vendor id, when known.
    pub vid: Option<u16>,
    /// USB product id, when known.
    pub pid: Option<u16>,
    /// USB product string, when known.
    pub product: Option<String>,
}

/// Enumerate serial devices.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|port| match port.port_type {
            SerialPortType::UsbPort(usb) => PortInfo {
                path: port.port_name,
                kind: "usb",
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product,
            },
            other => PortInfo {
                path: port.port_name,
                kind: kind_name(&other),
                vid: None,
                pid: None,
                product: None,
            },
        })
        .collect())
}

fn kind_name(port_type: &SerialPortType) -> &'static str {
    match port_type {
        SerialPortType::UsbPort(_) => "usb",
        SerialPortType::BluetoothPort => "bluetooth",
        SerialPortType::PciPort => "pci",
        SerialPortType::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_firmata_link() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.path, DEFAULT_PATH);
        assert_eq!(cfg.baud_rate, 57_600);
        assert_eq!(cfg.data_bits, DataBits::Eight);
        assert_eq!(cfg.stop_bits, StopBits::One);
        assert_eq!(cfg.parity, Parity::None);
    }

    #[test]
    fn builder_overrides() {
        let cfg = SerialConfig::new("/dev/ttyACM0")
            .with_baud_rate(115_200)
            .with_read_timeout(Duration::from_millis(5));
        assert_eq!(cfg.path, "/dev/ttyACM0");
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.read_timeout, Duration::from_millis(5));
    }

    #[test]
    fn open_missing_device_reports_path() {
        let cfg = SerialConfig::new("/dev/firmata-does-not-exist");
        let err = cfg.open().unwrap_err();
        match err {
            TransportError::Open { path, .. } => assert_eq!(path, "/dev/firmata-does-not-exist"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn kind_names() {
        assert_eq!(kind_name(&SerialPortType::BluetoothPort), "bluetooth");
        assert_eq!(kind_name(&SerialPortType::PciPort), "pci");
        assert_eq!(kind_name(&SerialPortType::Unknown), "unknown");
    }
}
