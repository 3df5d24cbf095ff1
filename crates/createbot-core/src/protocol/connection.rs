//! Connection management
//!
//! [`Robot`] is the explicit handle every behavior works through: it owns the
//! transport for its whole lifetime, frames commands with the codec and reads
//! sensor replies with a bounded wait.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::codec::{
    encode_command, encode_drive, encode_drive_direct, encode_leds, encode_motors,
    encode_play_song, encode_sensor_query,
};
use super::sensors::{BumpState, SensorPacket, SensorReading};
use super::transport::{SerialTransport, Transport};
use super::{
    BaudRate, Mode, Opcode, ProtocolError, Song, DEFAULT_DEVICE, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_REPLY_DELAY_MS, DEFAULT_TIMEOUT_MS,
};

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial device path
    pub port_name: String,
    /// Baud rate
    pub baud: BaudRate,
    /// Log every byte sent
    pub verbose: bool,
    /// Mode entered after `Start`
    pub mode: Mode,
    /// Longest wait for a single reply byte
    pub timeout_ms: u64,
    /// Interval between `bytes_waiting` polls
    pub poll_interval_ms: u64,
    /// Pause between a sensor query and the first poll
    pub reply_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_DEVICE.to_string(),
            baud: BaudRate::default(),
            verbose: false,
            mode: Mode::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reply_delay_ms: DEFAULT_REPLY_DELAY_MS,
        }
    }
}

/// Cumulative traffic on a connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficCounters {
    pub commands_sent: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Open Interface connection to one robot
pub struct Robot {
    transport: Option<Box<dyn Transport>>,
    timeout: Duration,
    poll_interval: Duration,
    reply_delay: Duration,
    counters: TrafficCounters,
}

impl Robot {
    /// Wrap an already open transport
    pub fn new(transport: Box<dyn Transport>, config: &ConnectionConfig) -> Self {
        Self {
            transport: Some(transport),
            timeout: Duration::from_millis(config.timeout_ms),
            // A zero interval would never let the wait reach its bound
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            reply_delay: Duration::from_millis(config.reply_delay_ms),
            counters: TrafficCounters::default(),
        }
    }

    /// Open the configured serial device
    pub fn open(config: &ConnectionConfig) -> Result<Self, ProtocolError> {
        let transport = SerialTransport::open(&config.port_name, config.baud, config.verbose)?;
        Ok(Self::new(Box::new(transport), config))
    }

    pub fn counters(&self) -> TrafficCounters {
        self.counters
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    fn transport(&mut self) -> Result<&mut (dyn Transport + 'static), ProtocolError> {
        match self.transport.as_deref_mut() {
            Some(t) => Ok(t),
            None => Err(ProtocolError::NotConnected),
        }
    }

    /// Send one framed command
    pub fn send_command(&mut self, frame: &[u8]) -> Result<(), ProtocolError> {
        self.transport()?.send_all(frame)?;
        self.counters.commands_sent += 1;
        self.counters.bytes_sent += frame.len() as u64;
        Ok(())
    }

    /// Start the Open Interface, enter `mode`, stop the cleaning motors and
    /// drop any bytes left over from a previous run
    pub fn start(&mut self, mode: Mode) -> Result<(), ProtocolError> {
        info!("Starting Open Interface in {:?} mode", mode);
        self.send_command(&encode_command(Opcode::Start.byte(), &[]))?;
        self.send_command(&encode_command(mode.opcode().byte(), &[]))?;
        self.send_command(&encode_motors(0))?;

        let transport = self.transport()?;
        let mut drained = 0usize;
        while transport.bytes_waiting()? > 0 {
            transport.read_byte()?;
            drained += 1;
        }
        if drained > 0 {
            debug!("start: discarded {} stale bytes", drained);
        }
        Ok(())
    }

    /// Wait up to `timeout` for one byte.
    ///
    /// Waiting is counted in poll intervals handed to [`Transport::pause`],
    /// so a simulated transport times out without sleeping.
    pub fn read_byte_timeout(&mut self, timeout: Duration) -> Result<u8, ProtocolError> {
        let poll = self.poll_interval;
        let transport = self
            .transport
            .as_deref_mut()
            .ok_or(ProtocolError::NotConnected)?;
        let mut waited = Duration::ZERO;

        loop {
            if transport.bytes_waiting()? > 0 {
                let byte = transport.read_byte()?;
                self.counters.bytes_received += 1;
                return Ok(byte);
            }
            if waited >= timeout {
                return Err(ProtocolError::Timeout {
                    waited_ms: waited.as_millis() as u64,
                });
            }
            transport.pause(poll);
            waited += poll;
        }
    }

    /// Query one sensor packet and decode the reply
    pub fn query(&mut self, packet: SensorPacket) -> Result<SensorReading, ProtocolError> {
        self.send_command(&encode_sensor_query(packet))?;
        if !self.reply_delay.is_zero() {
            let delay = self.reply_delay;
            self.transport()?.pause(delay);
        }

        let timeout = self.timeout;
        let mut reply = Vec::with_capacity(packet.reply_len());
        for _ in 0..packet.reply_len() {
            match self.read_byte_timeout(timeout) {
                Ok(b) => reply.push(b),
                Err(ProtocolError::Timeout { .. }) if !reply.is_empty() => {
                    // Part of the reply arrived; report it as malformed
                    warn!("query {:?}: reply cut short after {} bytes", packet, reply.len());
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let reading = packet.decode(&reply)?;
        debug!("query {:?} -> {:?}", packet, reading);
        Ok(reading)
    }

    pub fn bumps(&mut self) -> Result<BumpState, ProtocolError> {
        match self.query(SensorPacket::BumpsWheelDrops)? {
            SensorReading::Bumps(b) => Ok(b),
            other => Err(unexpected(SensorPacket::BumpsWheelDrops, other)),
        }
    }

    /// Raw buttons byte
    pub fn buttons(&mut self) -> Result<u8, ProtocolError> {
        match self.query(SensorPacket::Buttons)? {
            SensorReading::Buttons(b) => Ok(b),
            other => Err(unexpected(SensorPacket::Buttons, other)),
        }
    }

    /// Any button held down counts as a stop request
    pub fn button_pressed(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.buttons()? != 0)
    }

    /// Distance in mm since the last distance query
    pub fn distance(&mut self) -> Result<i16, ProtocolError> {
        match self.query(SensorPacket::Distance)? {
            SensorReading::Distance(v) => Ok(v),
            other => Err(unexpected(SensorPacket::Distance, other)),
        }
    }

    /// Angle turned since the last angle query
    pub fn angle(&mut self) -> Result<i16, ProtocolError> {
        match self.query(SensorPacket::Angle)? {
            SensorReading::Angle(v) => Ok(v),
            other => Err(unexpected(SensorPacket::Angle, other)),
        }
    }

    pub fn wall_signal(&mut self) -> Result<u16, ProtocolError> {
        match self.query(SensorPacket::WallSignal)? {
            SensorReading::WallSignal(v) => Ok(v),
            other => Err(unexpected(SensorPacket::WallSignal, other)),
        }
    }

    pub fn cliff_front_left(&mut self) -> Result<u16, ProtocolError> {
        match self.query(SensorPacket::CliffFrontLeftSignal)? {
            SensorReading::CliffFrontLeftSignal(v) => Ok(v),
            other => Err(unexpected(SensorPacket::CliffFrontLeftSignal, other)),
        }
    }

    /// Light bumper detection bits; bit 5 is the right-most sensor
    pub fn light_bumper(&mut self) -> Result<u8, ProtocolError> {
        match self.query(SensorPacket::LightBumper)? {
            SensorReading::LightBumper(v) => Ok(v),
            other => Err(unexpected(SensorPacket::LightBumper, other)),
        }
    }

    pub fn light_bump_right(&mut self) -> Result<u16, ProtocolError> {
        match self.query(SensorPacket::LightBumpRightSignal)? {
            SensorReading::LightBumpRightSignal(v) => Ok(v),
            other => Err(unexpected(SensorPacket::LightBumpRightSignal, other)),
        }
    }

    /// Read any unsigned signal packet as a plain number
    pub fn signal(&mut self, packet: SensorPacket) -> Result<u16, ProtocolError> {
        let reading = self.query(packet)?;
        u16::try_from(reading.as_i32()).map_err(|_| unexpected(packet, reading))
    }

    /// Drive with velocity (mm/s) and radius (mm)
    pub fn drive(&mut self, velocity: i16, radius: i16) -> Result<(), ProtocolError> {
        self.send_command(&encode_drive(velocity, radius))
    }

    /// Set each wheel velocity (mm/s)
    pub fn drive_direct(&mut self, left: i16, right: i16) -> Result<(), ProtocolError> {
        self.send_command(&encode_drive_direct(left, right))
    }

    /// Both wheels at the same velocity
    pub fn drive_straight(&mut self, velocity: i16) -> Result<(), ProtocolError> {
        self.drive_direct(velocity, velocity)
    }

    pub fn halt(&mut self) -> Result<(), ProtocolError> {
        self.drive_direct(0, 0)
    }

    pub fn set_leds(&mut self, bits: u8, power_color: u8, intensity: u8) -> Result<(), ProtocolError> {
        self.send_command(&encode_leds(bits, power_color, intensity))
    }

    /// Store `song` on its track
    pub fn define_song(&mut self, song: &Song) -> Result<(), ProtocolError> {
        self.send_command(&song.encode())
    }

    pub fn play_song(&mut self, track: u8) -> Result<(), ProtocolError> {
        self.send_command(&encode_play_song(track))
    }

    /// Store, play, and wait for a song to finish
    pub fn perform(&mut self, song: &Song) -> Result<(), ProtocolError> {
        self.define_song(song)?;
        self.delay(Duration::from_millis(100));
        self.play_song(song.track())?;
        self.delay(song.play_time());
        Ok(())
    }

    /// Stop the Open Interface
    pub fn power_down(&mut self) -> Result<(), ProtocolError> {
        info!("Powering down");
        self.send_command(&encode_command(Opcode::Stop.byte(), &[]))
    }

    /// Wait without polling
    pub fn delay(&mut self, duration: Duration) {
        if let Some(t) = self.transport.as_deref_mut() {
            t.pause(duration);
        }
    }

    /// Stop the wheels and release the transport
    pub fn close(&mut self) {
        if self.transport.is_none() {
            return;
        }
        if let Err(e) = self.halt() {
            warn!("close: could not stop wheels: {}", e);
        }
        if let Some(mut t) = self.transport.take() {
            t.close();
        }
        debug!(
            "closed after {} commands, {} bytes out, {} bytes in",
            self.counters.commands_sent, self.counters.bytes_sent, self.counters.bytes_received
        );
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        self.close();
    }
}

fn unexpected(packet: SensorPacket, reading: SensorReading) -> ProtocolError {
    ProtocolError::InvalidArgument(format!(
        "packet {:?} decoded as {:?}",
        packet, reading
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedCreate;

    fn robot_with(sim: SimulatedCreate) -> Robot {
        let config = ConnectionConfig {
            reply_delay_ms: 0,
            ..Default::default()
        };
        Robot::new(Box::new(sim), &config)
    }

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.port_name, "/dev/ttyUSB0");
        assert_eq!(config.baud, BaudRate::B115200);
        assert_eq!(config.mode, Mode::Full);
    }

    #[test]
    fn test_start_sequence() {
        let sim = SimulatedCreate::new();
        let log = sim.sent_log();
        let mut robot = robot_with(sim);
        robot.start(Mode::Full).unwrap();

        assert_eq!(log.frames(), vec![vec![128], vec![132], vec![138, 0]]);
    }

    #[test]
    fn test_start_drains_stale_bytes() {
        let mut sim = SimulatedCreate::new();
        sim.script(SensorPacket::Buttons, [0]);
        sim.inject_rx(&[1, 2, 3]);
        let mut robot = robot_with(sim);
        robot.start(Mode::Safe).unwrap();

        // The query sees its own reply, not the leftovers
        assert!(!robot.button_pressed().unwrap());
    }

    #[test]
    fn test_query_decodes_reply() {
        let mut sim = SimulatedCreate::new();
        sim.script(SensorPacket::Distance, [-500]);
        let log = sim.sent_log();
        let mut robot = robot_with(sim);

        assert_eq!(robot.distance().unwrap(), -500);
        assert_eq!(log.frames(), vec![vec![142, 19]]);
        assert_eq!(robot.counters().bytes_received, 2);
    }

    #[test]
    fn test_silent_device_times_out() {
        let mut sim = SimulatedCreate::new();
        sim.set_mute(true);
        let config = ConnectionConfig {
            timeout_ms: 60,
            poll_interval_ms: 15,
            reply_delay_ms: 0,
            ..Default::default()
        };
        let mut robot = Robot::new(Box::new(sim), &config);

        let err = robot.wall_signal().unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout { waited_ms: 60 }));
    }

    #[test]
    fn test_closed_robot_reports_not_connected() {
        let mut robot = robot_with(SimulatedCreate::new());
        robot.close();
        assert!(!robot.is_open());
        assert!(matches!(
            robot.drive_straight(100),
            Err(ProtocolError::NotConnected)
        ));
    }

    #[test]
    fn test_close_halts_wheels() {
        let sim = SimulatedCreate::new();
        let log = sim.sent_log();
        let mut robot = robot_with(sim);
        robot.drive_straight(200).unwrap();
        drop(robot);

        let frames = log.frames();
        assert_eq!(frames.last().unwrap(), &vec![145, 0, 0, 0, 0]);
    }
}
