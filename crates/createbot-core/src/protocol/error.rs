//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the robot
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Opening, configuring or writing to the serial device failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// No reply byte arrived within the bounded wait
    #[error("Timed out after {waited_ms}ms waiting for a reply byte")]
    Timeout { waited_ms: u64 },

    /// A sensor reply did not have the length its packet requires
    #[error("Short reply for sensor packet {packet}: expected {expected} bytes, got {received}")]
    ShortReply {
        packet: u8,
        expected: usize,
        received: usize,
    },

    /// Packet ID the codec has no layout for
    #[error("Unknown sensor packet: {0}")]
    UnknownPacket(u8),

    /// Caller-supplied value outside what the Open Interface accepts
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The transport was already closed
    #[error("Not connected to robot")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serialport::Error> for ProtocolError {
    fn from(err: serialport::Error) -> Self {
        ProtocolError::Transport(err.to_string())
    }
}

impl ProtocolError {
    /// True for faults of the serial channel itself, as opposed to bad replies
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProtocolError::Transport(_) | ProtocolError::NotConnected | ProtocolError::Io(_)
        )
    }
}
