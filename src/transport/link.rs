//! Byte links to the sensor.

use crate::config::SerialConfig;
use crate::error::{Result, SensorError};
use std::io::{self, Read, Write};

/// A bidirectional byte stream to the device
///
/// Implementations must not block indefinitely in `read_chunk`; a read that
/// times out without data returns `Ok(0)`.
#[cfg_attr(test, mockall::automock)]
pub trait SensorLink: Send {
    /// Read whatever is available into `buf`
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `data` to the device
    fn send(&mut self, data: &[u8]) -> io::Result<()>;
}

/// Serial port link, e.g. an RFCOMM device bound to the sensor
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink {
    /// Open the port described by `config`
    pub fn open(config: &SerialConfig) -> Result<Self> {
        if config.port.is_empty() {
            return Err(SensorError::Config("no serial port configured".into()));
        }

        let port = serialport::new(&config.port, config.baud)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| SensorError::from(e).with_context(format!("Opening {}", config.port)))?;

        tracing::info!("Opened {} at {} baud", config.port, config.baud);
        Ok(Self { port })
    }
}

impl SensorLink for SerialLink {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }
}

/// Names of the serial ports present on this machine
pub fn available_ports() -> Result<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}
