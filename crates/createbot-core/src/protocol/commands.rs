//! Protocol commands
//!
//! Defines the Open Interface opcodes used by the control programs.

use serde::{Deserialize, Serialize};

/// Open Interface opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// Start the Open Interface (must be sent first)
    Start = 128,
    /// Change the baud rate (1 arg: baud code)
    Baud = 129,
    /// Enter safe mode
    Safe = 131,
    /// Enter full mode (cliff and wheel-drop safety disabled)
    Full = 132,
    /// Drive with velocity and turn radius (2×int16)
    Drive = 137,
    /// Cleaning motors on/off (1 arg: motor bits)
    Motors = 138,
    /// LEDs (bits, power color, power intensity)
    Leds = 139,
    /// Define a song (track, length, then note/duration pairs)
    Song = 140,
    /// Play a previously defined song (1 arg: track)
    PlaySong = 141,
    /// Query a single sensor packet (1 arg: packet ID)
    Sensors = 142,
    /// Drive each wheel directly (right velocity, left velocity as int16)
    DriveDirect = 145,
    /// Stop the Open Interface and power down
    Stop = 173,
}

impl Opcode {
    /// Raw opcode byte
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Look up an opcode from its byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            128 => Opcode::Start,
            129 => Opcode::Baud,
            131 => Opcode::Safe,
            132 => Opcode::Full,
            137 => Opcode::Drive,
            138 => Opcode::Motors,
            139 => Opcode::Leds,
            140 => Opcode::Song,
            141 => Opcode::PlaySong,
            142 => Opcode::Sensors,
            145 => Opcode::DriveDirect,
            173 => Opcode::Stop,
            _ => return None,
        })
    }

    /// Number of argument bytes that follow the opcode.
    ///
    /// `None` for the song definition, whose length is carried in its second byte.
    pub fn arity(self) -> Option<usize> {
        match self {
            Opcode::Start | Opcode::Safe | Opcode::Full | Opcode::Stop => Some(0),
            Opcode::Baud | Opcode::Motors | Opcode::PlaySong | Opcode::Sensors => Some(1),
            Opcode::Leds => Some(3),
            Opcode::Drive | Opcode::DriveDirect => Some(4),
            Opcode::Song => None,
        }
    }
}

/// Operating mode entered right after `Start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Safe,
    #[default]
    Full,
}

impl Mode {
    pub fn opcode(self) -> Opcode {
        match self {
            Mode::Safe => Opcode::Safe,
            Mode::Full => Opcode::Full,
        }
    }
}

/// Baud rates the Open Interface can be switched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BaudRate {
    B300,
    B600,
    B1200,
    B2400,
    B4800,
    B9600,
    B14400,
    B19200,
    B28800,
    B38400,
    B57600,
    #[default]
    B115200,
}

impl BaudRate {
    const ALL: [BaudRate; 12] = [
        BaudRate::B300,
        BaudRate::B600,
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B14400,
        BaudRate::B19200,
        BaudRate::B28800,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    /// Baud code sent as the argument of [`Opcode::Baud`]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B300 => 300,
            BaudRate::B600 => 600,
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B14400 => 14400,
            BaudRate::B19200 => 19200,
            BaudRate::B28800 => 28800,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }

    /// Map a numeric rate (e.g. from the command line) onto a supported one
    pub fn from_bits_per_second(bps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.bits_per_second() == bps)
    }
}

/// LED bits for the [`Opcode::Leds`] command
pub mod led {
    pub const DEBRIS: u8 = 0b0001;
    pub const SPOT: u8 = 0b0010;
    pub const DOCK: u8 = 0b0100;
    pub const CHECK_ROBOT: u8 = 0b1000;

    /// Full power LED intensity
    pub const FULL_INTENSITY: u8 = 255;
    /// Power LED color: green
    pub const GREEN: u8 = 0;
    /// Power LED color: red
    pub const RED: u8 = 255;
}
