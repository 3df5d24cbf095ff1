//! Serial port handling
//!
//! Port discovery and the low-level open/configure steps used by
//! [`super::SerialTransport`].

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;

use super::{BaudRate, ProtocolError};

/// A serial device the robot may be attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path (e.g. "/dev/ttyUSB0" or "COM3")
    pub name: String,
    /// USB product string, when the port is a USB adapter
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let product = match info.port_type {
            SerialPortType::UsbPort(usb) => usb.product,
            _ => None,
        };
        Self {
            name: info.port_name,
            product,
        }
    }
}

/// Sort key putting USB-serial adapters (the usual Create cable) first:
/// ttyUSB* by number, then ttyACM*, then everything else by name
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        return (0, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        return (1, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List candidate serial ports in a stable order
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect();

    // udev does not always report USB adapters; fall back to scanning /dev
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            let Some(fname) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !(fname.starts_with("ttyUSB") || fname.starts_with("ttyACM")) {
                continue;
            }
            let full = format!("/dev/{}", fname);
            if !ports.iter().any(|p| p.name == full) {
                ports.push(PortInfo {
                    name: full,
                    product: None,
                });
            }
        }
    }

    ports.sort_by_key(|p| port_sort_key(&p.name));
    ports
}

/// Open a serial port at the given rate.
///
/// The port-level timeout only bounds individual reads; reply waits are
/// bounded separately by the connection.
pub fn open_port(name: &str, baud: BaudRate) -> Result<Box<dyn SerialPort>, ProtocolError> {
    serialport::new(name, baud.bits_per_second())
        .timeout(Duration::from_millis(100))
        .open()
        .map_err(|e| ProtocolError::Transport(format!("{}: {}", name, e)))
}

/// Configure 8N1 without flow control, as the Open Interface expects
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight)?;
    port.set_parity(serialport::Parity::None)?;
    port.set_stop_bits(serialport::StopBits::One)?;
    port.set_flow_control(serialport::FlowControl::None)?;
    Ok(())
}

/// Discard anything left in the input and output buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(serialport::ClearBuffer::All)?;
    Ok(())
}
