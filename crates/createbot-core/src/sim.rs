//! Simulated robot for running behaviors without hardware
//!
//! [`SimulatedCreate`] implements [`Transport`]: it reassembles outgoing
//! command frames, answers sensor queries from scripted values and keeps a
//! virtual clock instead of sleeping. A [`SentLog`] handle stays with the
//! caller so the traffic can be inspected after the transport has been moved
//! into a [`crate::protocol::Robot`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

use crate::protocol::codec::{encode_i16, encode_u16};
use crate::protocol::sensors::BUTTON_CLEAN;
use crate::protocol::{Opcode, ProtocolError, SensorPacket, Transport};

#[derive(Debug, Default)]
struct LogState {
    frames: Vec<Vec<u8>>,
    elapsed: Duration,
}

/// Shared view of what a simulator has received
#[derive(Debug, Clone, Default)]
pub struct SentLog {
    inner: Arc<Mutex<LogState>>,
}

impl SentLog {
    /// Every complete command frame, in order
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.lock().frames.clone()
    }

    /// Frames starting with `opcode`
    pub fn frames_with(&self, opcode: Opcode) -> Vec<Vec<u8>> {
        self.lock()
            .frames
            .iter()
            .filter(|f| f.first() == Some(&opcode.byte()))
            .cloned()
            .collect()
    }

    /// Sensor packet IDs queried, in order
    pub fn queries(&self) -> Vec<u8> {
        self.frames_with(Opcode::Sensors)
            .iter()
            .filter_map(|f| f.get(1).copied())
            .collect()
    }

    /// Total time spent in `pause`
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LogState> {
        // A panicking test thread must not hide the log from the assertion
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Scripted stand-in for a Create on the serial line
pub struct SimulatedCreate {
    rx: VecDeque<u8>,
    pending: Vec<u8>,
    scripts: HashMap<SensorPacket, VecDeque<i32>>,
    steady: HashMap<SensorPacket, i32>,
    button_after: Option<usize>,
    button_polls: usize,
    mute: bool,
    closed: bool,
    log: SentLog,
}

impl Default for SimulatedCreate {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCreate {
    /// A robot whose sensors all read zero
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            pending: Vec::new(),
            scripts: HashMap::new(),
            steady: HashMap::new(),
            button_after: None,
            button_polls: 0,
            mute: false,
            closed: false,
            log: SentLog::default(),
        }
    }

    /// A robot that wanders near a wall and has its button pressed after a
    /// while, so every behavior terminates
    pub fn demo() -> Self {
        let mut sim = Self::new();
        sim.set_steady(SensorPacket::WallSignal, 300);
        sim.set_steady(SensorPacket::LightBumpRightSignal, 420);
        sim.set_steady(SensorPacket::LightBumper, 32);
        sim.set_steady(SensorPacket::CliffFrontLeftSignal, 1200);
        sim.set_steady(SensorPacket::Distance, 10);
        sim.script(SensorPacket::BumpsWheelDrops, [0, 0, 0, 1, 0, 0, 2, 0, 3]);
        sim.press_button_after(200);
        sim
    }

    pub fn sent_log(&self) -> SentLog {
        self.log.clone()
    }

    /// Queue values returned by successive queries of `packet`
    pub fn script(&mut self, packet: SensorPacket, values: impl IntoIterator<Item = i32>) {
        self.scripts.entry(packet).or_default().extend(values);
    }

    /// Value returned once the script for `packet` is exhausted
    pub fn set_steady(&mut self, packet: SensorPacket, value: i32) {
        self.steady.insert(packet, value);
    }

    /// Report the button as pressed from the `polls`-th buttons query on
    pub fn press_button_after(&mut self, polls: usize) {
        self.button_after = Some(polls);
    }

    /// Stop answering queries
    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    /// Put raw bytes on the receive line
    pub fn inject_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    fn next_value(&mut self, packet: SensorPacket) -> i32 {
        if packet == SensorPacket::Buttons {
            self.button_polls += 1;
            if let Some(after) = self.button_after {
                if self.button_polls >= after {
                    return i32::from(BUTTON_CLEAN);
                }
            }
        }
        self.scripts
            .get_mut(&packet)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.steady.get(&packet).copied().unwrap_or(0))
    }

    fn answer(&mut self, packet_id: u8) {
        let packet = match SensorPacket::from_id(packet_id) {
            Ok(p) => p,
            Err(e) => {
                warn!("sim: {}", e);
                return;
            }
        };
        let value = self.next_value(packet);
        if self.mute {
            return;
        }
        match (packet.reply_len(), packet.is_signed()) {
            (1, _) => self.rx.push_back(value as u8),
            (_, true) => self.rx.extend(encode_i16(value as i16)),
            (_, false) => self.rx.extend(encode_u16(value as u16)),
        }
    }

    /// Expected length of the frame collected so far, if known yet
    fn frame_len(&self) -> Option<usize> {
        let first = *self.pending.first()?;
        match Opcode::from_byte(first) {
            Some(Opcode::Song) => self.pending.get(2).map(|&n| 3 + 2 * n as usize),
            Some(op) => op.arity().map(|n| 1 + n),
            // Unknown bytes are logged on their own
            None => Some(1),
        }
    }

    fn take_frame(&mut self) {
        let frame = std::mem::take(&mut self.pending);
        if frame.first() == Some(&Opcode::Sensors.byte()) {
            self.answer(frame[1]);
        } else if Opcode::from_byte(frame[0]).is_none() {
            warn!("sim: unknown opcode {}", frame[0]);
        }
        self.log.lock().frames.push(frame);
    }
}

impl Transport for SimulatedCreate {
    fn send(&mut self, byte: u8) -> Result<(), ProtocolError> {
        if self.closed {
            return Err(ProtocolError::NotConnected);
        }
        self.pending.push(byte);
        if self.frame_len() == Some(self.pending.len()) {
            self.take_frame();
        }
        Ok(())
    }

    fn bytes_waiting(&mut self) -> Result<u32, ProtocolError> {
        if self.closed {
            return Err(ProtocolError::NotConnected);
        }
        Ok(self.rx.len() as u32)
    }

    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        self.rx.pop_front().ok_or(ProtocolError::Timeout { waited_ms: 0 })
    }

    fn pause(&mut self, duration: Duration) {
        self.log.lock().elapsed += duration;
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_frames_are_reassembled() {
        let mut sim = SimulatedCreate::new();
        let log = sim.sent_log();
        sim.send_all(&[128, 132, 145, 0, 100]).unwrap();
        assert_eq!(log.frames(), vec![vec![128], vec![132]]);

        sim.send_all(&[0, 100, 140, 1, 2, 60, 8, 62, 8, 173]).unwrap();
        assert_eq!(
            log.frames(),
            vec![
                vec![128],
                vec![132],
                vec![145, 0, 100, 0, 100],
                vec![140, 1, 2, 60, 8, 62, 8],
                vec![173],
            ]
        );
    }

    #[test]
    fn test_scripted_replies_then_steady() {
        let mut sim = SimulatedCreate::new();
        sim.script(SensorPacket::Angle, [-2]);
        sim.set_steady(SensorPacket::Angle, 7);

        sim.send_all(&[142, 20]).unwrap();
        assert_eq!(sim.bytes_waiting().unwrap(), 2);
        assert_eq!((sim.read_byte().unwrap(), sim.read_byte().unwrap()), (0xFF, 0xFE));

        sim.send_all(&[142, 20]).unwrap();
        assert_eq!((sim.read_byte().unwrap(), sim.read_byte().unwrap()), (0x00, 0x07));
    }

    #[test]
    fn test_button_press_after_polls() {
        let mut sim = SimulatedCreate::new();
        sim.press_button_after(2);
        sim.send_all(&[142, 18, 142, 18]).unwrap();
        assert_eq!(sim.rx, VecDeque::from(vec![0, 1]));
    }

    #[test]
    fn test_pause_advances_virtual_clock() {
        let mut sim = SimulatedCreate::new();
        let log = sim.sent_log();
        sim.pause(Duration::from_secs(5));
        sim.pause(Duration::from_millis(250));
        assert_eq!(log.elapsed(), Duration::from_millis(5250));
    }

    #[test]
    fn test_closed_sim_rejects_traffic() {
        let mut sim = SimulatedCreate::new();
        sim.close();
        assert!(sim.send(128).is_err());
        assert!(sim.bytes_waiting().is_err());
    }
}
