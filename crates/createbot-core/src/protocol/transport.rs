//! Byte-level channel to the robot
//!
//! [`Transport`] is the only I/O boundary of the crate. The serial
//! implementation talks to real hardware; [`crate::sim::SimulatedCreate`]
//! stands in for it in tests and dry runs.

use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

use super::serial::{clear_buffers, configure_port, open_port};
use super::{BaudRate, ProtocolError};

/// Single-reader byte channel
pub trait Transport: Send {
    /// Send one byte
    fn send(&mut self, byte: u8) -> Result<(), ProtocolError>;

    /// Send a whole command frame
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        for &b in bytes {
            self.send(b)?;
        }
        Ok(())
    }

    /// Number of received bytes ready to be read
    fn bytes_waiting(&mut self) -> Result<u32, ProtocolError>;

    /// Read one byte. Callers check [`Transport::bytes_waiting`] first.
    fn read_byte(&mut self) -> Result<u8, ProtocolError>;

    /// Wait between commands
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Release the underlying device. Further use fails with `NotConnected`.
    fn close(&mut self);
}

/// Serial port implementation of [`Transport`]
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
    verbose: bool,
}

impl SerialTransport {
    /// Open and configure the device at `path`
    pub fn open(path: &str, baud: BaudRate, verbose: bool) -> Result<Self, ProtocolError> {
        let mut port = open_port(path, baud)?;
        configure_port(port.as_mut())?;
        clear_buffers(port.as_mut())?;
        info!(
            "Opened {} at {} baud",
            path,
            baud.bits_per_second()
        );
        Ok(Self {
            port: Some(port),
            name: path.to_string(),
            verbose,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, ProtocolError> {
        self.port.as_mut().ok_or(ProtocolError::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, byte: u8) -> Result<(), ProtocolError> {
        self.send_all(&[byte])
    }

    fn send_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let verbose = self.verbose;
        let port = self.port()?;
        port.write_all(bytes)
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;
        if verbose {
            debug!("sent {:?}", bytes);
        }
        Ok(())
    }

    fn bytes_waiting(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.port()?.bytes_to_read()?)
    }

    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        let mut buf = [0u8; 1];
        self.port()?
            .read_exact(&mut buf)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                    ProtocolError::Timeout { waited_ms: 0 }
                }
                _ => ProtocolError::Transport(e.to_string()),
            })?;
        Ok(buf[0])
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed {}", self.name);
        }
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}
