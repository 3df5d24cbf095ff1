//! Command encoding and reply decoding
//!
//! Every multi-byte Open Interface value travels high byte first. Encoding
//! and decoding here are exact inverses over the full 16-bit range:
//! - signed fields (velocity, radius, distance, angle) use two's complement
//! - unsigned fields (wall and cliff signals) are plain big-endian
//!
//! Nothing here validates opcode or argument legality; callers are trusted.

use byteorder::{BigEndian, ByteOrder};

use super::commands::Opcode;
use super::sensors::{BumpState, SensorPacket};

/// Mask that keeps the two bumper bits of packet 7 and drops the wheel drops
pub const BUMP_MASK: u8 = 0b011;

/// Drive radius meaning "straight ahead"
pub const RADIUS_STRAIGHT: i16 = i16::MAX;
/// Drive radius for turning in place clockwise
pub const RADIUS_TURN_CW: i16 = -1;
/// Drive radius for turning in place counter-clockwise
pub const RADIUS_TURN_CCW: i16 = 1;

/// Frame an opcode and its arguments: `[opcode] ++ args`
pub fn encode_command(opcode: u8, args: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + args.len());
    frame.push(opcode);
    frame.extend_from_slice(args);
    frame
}

/// Split a signed 16-bit value into `[high, low]`
pub fn encode_i16(value: i16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    BigEndian::write_i16(&mut buf, value);
    buf
}

/// Split an unsigned 16-bit value into `[high, low]`
pub fn encode_u16(value: u16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, value);
    buf
}

/// Rebuild a signed value from two bytes in transmission order
pub fn decode_i16(b0: u8, b1: u8) -> i16 {
    BigEndian::read_i16(&[b0, b1])
}

/// Rebuild an unsigned value from two bytes in transmission order
pub fn decode_u16(b0: u8, b1: u8) -> u16 {
    BigEndian::read_u16(&[b0, b1])
}

/// Bumper state of a raw bumps/wheel-drops byte
pub fn decode_bump(raw: u8) -> BumpState {
    BumpState::from_bits(raw & BUMP_MASK)
}

/// Drive with a velocity (mm/s) and turn radius (mm)
pub fn encode_drive(velocity: i16, radius: i16) -> Vec<u8> {
    CommandBuilder::new(Opcode::Drive)
        .i16_be(velocity)
        .i16_be(radius)
        .build()
}

/// Drive each wheel directly; the right wheel goes on the wire first
pub fn encode_drive_direct(left: i16, right: i16) -> Vec<u8> {
    CommandBuilder::new(Opcode::DriveDirect)
        .i16_be(right)
        .i16_be(left)
        .build()
}

pub fn encode_leds(bits: u8, power_color: u8, intensity: u8) -> Vec<u8> {
    encode_command(Opcode::Leds.byte(), &[bits, power_color, intensity])
}

pub fn encode_motors(bits: u8) -> Vec<u8> {
    encode_command(Opcode::Motors.byte(), &[bits])
}

pub fn encode_sensor_query(packet: SensorPacket) -> Vec<u8> {
    encode_command(Opcode::Sensors.byte(), &[packet.id()])
}

pub fn encode_play_song(track: u8) -> Vec<u8> {
    encode_command(Opcode::PlaySong.byte(), &[track])
}

/// Builder for command frames with typed arguments
pub struct CommandBuilder {
    frame: Vec<u8>,
}

impl CommandBuilder {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            frame: vec![opcode.byte()],
        }
    }

    /// Add a single byte
    pub fn byte(mut self, b: u8) -> Self {
        self.frame.push(b);
        self
    }

    /// Add a signed 16-bit value (big-endian)
    pub fn i16_be(mut self, value: i16) -> Self {
        self.frame.extend_from_slice(&encode_i16(value));
        self
    }

    /// Add raw bytes
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.frame.extend_from_slice(data);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command_passthrough() {
        assert_eq!(encode_command(128, &[]), vec![128]);
        assert_eq!(encode_command(139, &[9, 255, 255]), vec![139, 9, 255, 255]);
        // Illegal opcodes are not rejected
        assert_eq!(encode_command(0, &[1, 2]), vec![0, 1, 2]);
    }

    #[test]
    fn test_encode_negative_500() {
        assert_eq!(encode_i16(-500), [0xFE, 0x0C]);
        assert_eq!(decode_i16(0xFE, 0x0C), -500);
    }

    #[test]
    fn test_encode_extremes() {
        assert_eq!(encode_i16(i16::MIN), [0x80, 0x00]);
        assert_eq!(encode_i16(i16::MAX), [0x7F, 0xFF]);
        assert_eq!(encode_i16(-1), [0xFF, 0xFF]);
        assert_eq!(decode_u16(0xFF, 0xFF), 65535);
        assert_eq!(decode_i16(0xFF, 0xFF), -1);
    }

    #[test]
    fn test_byte_order_matters() {
        // 0x01F4 = 500; swapped gives 0xF401 which is a valid but wrong value
        assert_eq!(decode_u16(0x01, 0xF4), 500);
        assert_eq!(decode_u16(0xF4, 0x01), 62465);
        assert_eq!(decode_i16(0x0C, 0xFE), 3326);
    }

    #[test]
    fn test_drive_direct_wire_order() {
        assert_eq!(
            encode_drive_direct(100, -100),
            vec![145, 0xFF, 0x9C, 0x00, 0x64]
        );
    }

    #[test]
    fn test_drive_reverse_arc() {
        // -500 mm/s on a 1 m radius
        assert_eq!(encode_drive(-500, 1000), vec![137, 0xFE, 0x0C, 0x03, 0xE8]);
        assert_eq!(
            encode_drive(100, RADIUS_STRAIGHT),
            vec![137, 0x00, 0x64, 0x7F, 0xFF]
        );
    }

    #[test]
    fn test_turn_in_place_radii() {
        assert_eq!(encode_drive(100, RADIUS_TURN_CW), vec![137, 0x00, 0x64, 0xFF, 0xFF]);
        assert_eq!(encode_drive(100, RADIUS_TURN_CCW), vec![137, 0x00, 0x64, 0x00, 0x01]);
    }

    #[test]
    fn test_bump_mask_discards_wheel_drops() {
        assert_eq!(decode_bump(0b1111_1100).bits(), 0);
        assert_eq!(decode_bump(0b0000_1101).bits(), 0b01);
        assert_eq!(decode_bump(0b0000_0011).bits(), 0b11);
    }

    #[test]
    fn test_command_builder() {
        let frame = CommandBuilder::new(Opcode::Leds)
            .byte(8)
            .byte(0)
            .byte(255)
            .build();
        assert_eq!(frame, vec![139, 8, 0, 255]);

        let frame = CommandBuilder::new(Opcode::Song)
            .bytes(&[0, 1])
            .bytes(&[91, 8])
            .build();
        assert_eq!(frame, vec![140, 0, 1, 91, 8]);
    }
}
