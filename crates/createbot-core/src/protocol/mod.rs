//! Open Interface Protocol
//!
//! Implements the iRobot Open Interface serial protocol: fixed opcodes
//! followed by fixed-arity arguments, with sensor values polled one packet
//! at a time and returned high byte first.

pub mod codec;
pub mod commands;
mod connection;
mod error;
pub mod sensors;
pub mod serial;
mod song;
mod transport;

pub use codec::CommandBuilder;
pub use commands::{led, BaudRate, Mode, Opcode};
pub use connection::{ConnectionConfig, Robot, TrafficCounters};
pub use error::ProtocolError;
pub use sensors::{BumpState, SensorPacket, SensorReading};
pub use serial::{list_ports, PortInfo};
pub use song::{Note, Song};
pub use transport::{SerialTransport, Transport};

/// Serial device the Create cable usually enumerates as
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Default timeout for a single reply byte in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

/// Interval between reply polls in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15;

/// Wait after a sensor query before polling; the robot updates sensors every 15ms
pub const DEFAULT_REPLY_DELAY_MS: u64 = 15;
