//! Serial transport for RS-232 / USB-serial Elliptec buses.

use super::Transport;
use crate::config::SerialSettings;
use crate::error::TransportError;
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Internal poll interval of the OS-level read timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Serial adapter for Elliptec devices
///
/// This adapter wraps the serialport crate with blocking I/O. Elliptec buses run
/// at 9600 baud, 8 data bits, no parity, one stop bit, no flow control.
pub struct SerialAdapter {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    port_name: String,

    /// Baud rate
    baud_rate: u32,

    /// Overall read timeout for one response
    timeout: Duration,

    /// The open port, if connected
    port: Option<Box<dyn SerialPort>>,
}

impl SerialAdapter {
    /// Create a new serial adapter with default settings
    ///
    /// # Arguments
    /// * `port_name` - Serial port path (e.g., "/dev/ttyUSB0", "COM3")
    /// * `baud_rate` - Communication speed (9600 for Elliptec)
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            timeout: SerialSettings::default().timeout,
            port: None,
        }
    }

    /// Create an adapter from configuration.
    pub fn from_settings(settings: &SerialSettings) -> Self {
        Self::new(settings.port.clone(), settings.baud_rate).with_timeout(settings.timeout)
    }

    /// Set the overall read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Open the port.
    ///
    /// # Errors
    /// Returns [`TransportError::Open`] if the port cannot be opened.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(POLL_INTERVAL.min(self.timeout))
            .open()
            .map_err(|e| TransportError::Open {
                port: self.port_name.clone(),
                reason: e.to_string(),
            })?;

        self.port = Some(port);
        debug!(
            port = %self.port_name,
            baud_rate = self.baud_rate,
            "Serial port opened"
        );
        Ok(())
    }

    /// Open the port and return the connected adapter.
    ///
    /// # Errors
    /// Returns [`TransportError::Open`] if the port cannot be opened.
    pub fn open(mut self) -> Result<Self, TransportError> {
        self.connect()?;
        Ok(self)
    }

    /// True while the port is open.
    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::Closed)
    }
}

impl Transport for SerialAdapter {
    fn name(&self) -> &str {
        &self.port_name
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port_mut()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read_until(&mut self, terminator: &[u8]) -> Result<Vec<u8>, TransportError> {
        let timeout = self.timeout;
        let port = self.port_mut()?;

        let mut response = Vec::with_capacity(64);
        let mut buffer = [0u8; 1];
        let start = Instant::now();

        loop {
            if start.elapsed() > timeout {
                trace!(
                    received = response.len(),
                    ?timeout,
                    "Serial read timed out before terminator"
                );
                break;
            }

            match port.read(&mut buffer) {
                Ok(1) => {
                    response.push(buffer[0]);
                    if response.ends_with(terminator) {
                        break;
                    }
                }
                Ok(_) => {
                    // EOF - shouldn't happen with serial ports
                    break;
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    // Port timeout is shorter than our overall timeout
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(response)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.port.take().is_some() {
            debug!(port = %self.port_name, "Serial port closed");
        }
        Ok(())
    }
}
