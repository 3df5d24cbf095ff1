//! Sensor packet definitions and reply decoding
//!
//! Each packet has a fixed reply length (1 or 2 bytes). Two-byte replies are
//! big-endian and either signed (distance, angle) or unsigned (signal strengths).

use serde::{Deserialize, Serialize};

use super::codec::{decode_bump, decode_i16, decode_u16};
use super::ProtocolError;

/// Sensor packet IDs queried with [`super::Opcode::Sensors`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SensorPacket {
    /// Bumpers and wheel drops (7)
    BumpsWheelDrops = 7,
    /// Button state (18)
    Buttons = 18,
    /// Distance travelled since last request, mm (19)
    Distance = 19,
    /// Angle turned since last request (20)
    Angle = 20,
    /// Wall sensor signal strength, 0-1023 (27)
    WallSignal = 27,
    /// Front-left cliff sensor signal strength, 0-4095 (29)
    CliffFrontLeftSignal = 29,
    /// Light bumper detection bits (45)
    LightBumper = 45,
    /// Right light bump signal strength, 0-4095 (51)
    LightBumpRightSignal = 51,
}

impl SensorPacket {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self, ProtocolError> {
        Ok(match id {
            7 => SensorPacket::BumpsWheelDrops,
            18 => SensorPacket::Buttons,
            19 => SensorPacket::Distance,
            20 => SensorPacket::Angle,
            27 => SensorPacket::WallSignal,
            29 => SensorPacket::CliffFrontLeftSignal,
            45 => SensorPacket::LightBumper,
            51 => SensorPacket::LightBumpRightSignal,
            other => return Err(ProtocolError::UnknownPacket(other)),
        })
    }

    /// Number of reply bytes
    pub fn reply_len(self) -> usize {
        match self {
            SensorPacket::BumpsWheelDrops | SensorPacket::Buttons | SensorPacket::LightBumper => 1,
            _ => 2,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, SensorPacket::Distance | SensorPacket::Angle)
    }

    /// Decode a reply read in transmission order
    pub fn decode(self, bytes: &[u8]) -> Result<SensorReading, ProtocolError> {
        if bytes.len() != self.reply_len() {
            return Err(ProtocolError::ShortReply {
                packet: self.id(),
                expected: self.reply_len(),
                received: bytes.len(),
            });
        }

        let reading = match self {
            SensorPacket::BumpsWheelDrops => SensorReading::Bumps(decode_bump(bytes[0])),
            SensorPacket::Buttons => SensorReading::Buttons(bytes[0]),
            SensorPacket::LightBumper => SensorReading::LightBumper(bytes[0]),
            SensorPacket::Distance => SensorReading::Distance(decode_i16(bytes[0], bytes[1])),
            SensorPacket::Angle => SensorReading::Angle(decode_i16(bytes[0], bytes[1])),
            SensorPacket::WallSignal => SensorReading::WallSignal(decode_u16(bytes[0], bytes[1])),
            SensorPacket::CliffFrontLeftSignal => {
                SensorReading::CliffFrontLeftSignal(decode_u16(bytes[0], bytes[1]))
            }
            SensorPacket::LightBumpRightSignal => {
                SensorReading::LightBumpRightSignal(decode_u16(bytes[0], bytes[1]))
            }
        };
        Ok(reading)
    }
}

/// A decoded sensor value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorReading {
    Bumps(BumpState),
    Buttons(u8),
    Distance(i16),
    Angle(i16),
    WallSignal(u16),
    CliffFrontLeftSignal(u16),
    LightBumper(u8),
    LightBumpRightSignal(u16),
}

impl SensorReading {
    /// Packet this reading was decoded from
    pub fn packet(&self) -> SensorPacket {
        match self {
            SensorReading::Bumps(_) => SensorPacket::BumpsWheelDrops,
            SensorReading::Buttons(_) => SensorPacket::Buttons,
            SensorReading::Distance(_) => SensorPacket::Distance,
            SensorReading::Angle(_) => SensorPacket::Angle,
            SensorReading::WallSignal(_) => SensorPacket::WallSignal,
            SensorReading::CliffFrontLeftSignal(_) => SensorPacket::CliffFrontLeftSignal,
            SensorReading::LightBumper(_) => SensorPacket::LightBumper,
            SensorReading::LightBumpRightSignal(_) => SensorPacket::LightBumpRightSignal,
        }
    }

    /// Numeric value regardless of packet
    pub fn as_i32(&self) -> i32 {
        match *self {
            SensorReading::Bumps(b) => b.bits() as i32,
            SensorReading::Buttons(v) | SensorReading::LightBumper(v) => v as i32,
            SensorReading::Distance(v) | SensorReading::Angle(v) => v as i32,
            SensorReading::WallSignal(v)
            | SensorReading::CliffFrontLeftSignal(v)
            | SensorReading::LightBumpRightSignal(v) => v as i32,
        }
    }
}

/// Bumper bits after the wheel drops are masked off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BumpState(u8);

impl BumpState {
    pub const NONE: BumpState = BumpState(0);
    pub const RIGHT: BumpState = BumpState(0b01);
    pub const LEFT: BumpState = BumpState(0b10);
    pub const BOTH: BumpState = BumpState(0b11);

    /// Bits above the bumper mask are dropped
    pub fn from_bits(bits: u8) -> Self {
        BumpState(bits & 0b11)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn right(self) -> bool {
        self.0 & 0b01 != 0
    }

    pub fn left(self) -> bool {
        self.0 & 0b10 != 0
    }

    pub fn both(self) -> bool {
        self.0 == 0b11
    }

    pub fn any(self) -> bool {
        self.0 != 0
    }
}

/// Clean button bit of the buttons packet
pub const BUTTON_CLEAN: u8 = 0b0000_0001;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_lengths() {
        assert_eq!(SensorPacket::BumpsWheelDrops.reply_len(), 1);
        assert_eq!(SensorPacket::Buttons.reply_len(), 1);
        assert_eq!(SensorPacket::Distance.reply_len(), 2);
        assert_eq!(SensorPacket::WallSignal.reply_len(), 2);
        assert_eq!(SensorPacket::LightBumpRightSignal.reply_len(), 2);
    }

    #[test]
    fn test_signedness() {
        assert!(SensorPacket::Distance.is_signed());
        assert!(SensorPacket::Angle.is_signed());
        assert!(!SensorPacket::WallSignal.is_signed());
        assert!(!SensorPacket::CliffFrontLeftSignal.is_signed());
    }

    #[test]
    fn test_decode_distance_negative() {
        let reading = SensorPacket::Distance.decode(&[0xFE, 0x0C]).unwrap();
        assert_eq!(reading, SensorReading::Distance(-500));
        assert_eq!(reading.as_i32(), -500);
    }

    #[test]
    fn test_decode_wall_signal_high_bit() {
        // Unsigned fields keep the top bit as magnitude
        let reading = SensorPacket::WallSignal.decode(&[0x80, 0x01]).unwrap();
        assert_eq!(reading, SensorReading::WallSignal(32769));
    }

    #[test]
    fn test_decode_bumps() {
        let reading = SensorPacket::BumpsWheelDrops.decode(&[0b0000_1110]).unwrap();
        assert_eq!(reading, SensorReading::Bumps(BumpState::LEFT));
    }

    #[test]
    fn test_short_reply_is_error() {
        let err = SensorPacket::Angle.decode(&[0x01]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ShortReply {
                packet: 20,
                expected: 2,
                received: 1
            }
        ));
        assert!(SensorPacket::Buttons.decode(&[]).is_err());
        assert!(SensorPacket::Buttons.decode(&[1, 2]).is_err());
    }

    #[test]
    fn test_from_id() {
        assert_eq!(SensorPacket::from_id(29).unwrap(), SensorPacket::CliffFrontLeftSignal);
        assert!(matches!(
            SensorPacket::from_id(99),
            Err(ProtocolError::UnknownPacket(99))
        ));
    }

    #[test]
    fn test_bump_state_flags() {
        assert!(BumpState::RIGHT.right() && !BumpState::RIGHT.left());
        assert!(BumpState::LEFT.left() && !BumpState::LEFT.both());
        assert!(BumpState::BOTH.both() && BumpState::BOTH.any());
        assert!(!BumpState::NONE.any());
        assert_eq!(BumpState::from_bits(0xFF), BumpState::BOTH);
    }
}
