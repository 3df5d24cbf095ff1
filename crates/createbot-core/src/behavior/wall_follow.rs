//! Wall following with PI steering
//!
//! The run has three phases:
//! 1. drive straight until a bumper touches the wall
//! 2. rotate in place until the wall sensor sees the wall; the reading
//!    minus an offset becomes the reference
//! 3. steer along the wall with the PI controller, re-aligning whenever
//!    both bumpers hit something. Re-aligning only moves the reference;
//!    the accumulated error and wheel velocities carry over

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{millis, Behavior, RunSummary};
use crate::control::{PiController, PiGains, SteeringState, WheelVelocities};
use crate::protocol::{ProtocolError, Robot, SensorPacket};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallFollowConfig {
    pub gains: PiGains,
    /// Clamp on the accumulated error; unbounded when absent
    pub integral_limit: Option<f64>,
    /// Velocity both wheels start from, mm/s
    pub base_velocity: i16,
    /// Wheel velocity limit, mm/s
    pub max_wheel_speed: i16,
    /// Signal packet used as the distance-to-wall measurement
    pub wall_sensor: SensorPacket,
    pub tick_ms: u64,
    /// Wheel speed while searching and rotating, mm/s
    pub search_speed: i16,
    /// Reading at which the wall counts as found while aligning
    pub align_threshold: u16,
    /// Subtracted from the aligned reading to form the reference
    pub reference_offset: u16,
    /// Light bumper bits meaning "obstacle on the right only"
    pub obstacle_pattern: u8,
    /// Clear the integral and return to base velocities after re-aligning;
    /// otherwise only the reference changes
    pub reset_on_realign: bool,
}

impl Default for WallFollowConfig {
    fn default() -> Self {
        Self {
            gains: PiGains::default(),
            integral_limit: None,
            base_velocity: 100,
            max_wheel_speed: 500,
            wall_sensor: SensorPacket::LightBumpRightSignal,
            tick_ms: 100,
            search_speed: 50,
            align_threshold: 50,
            reference_offset: 100,
            obstacle_pattern: 0b10_0000,
            reset_on_realign: false,
        }
    }
}

/// Outcome of a sub-routine that can be interrupted by the button
enum Phase<T> {
    Done(T),
    Stopped,
}

pub struct WallFollow {
    config: WallFollowConfig,
    ticks: u64,
}

impl WallFollow {
    pub fn new(config: WallFollowConfig) -> Self {
        Self { config, ticks: 0 }
    }

    fn controller(&self) -> PiController {
        let pi = PiController::new(self.config.gains);
        match self.config.integral_limit {
            Some(limit) => pi.with_integral_limit(limit),
            None => pi,
        }
    }

    fn read_wall(&self, robot: &mut Robot) -> Result<u16, ProtocolError> {
        match self.config.wall_sensor {
            SensorPacket::LightBumpRightSignal => robot.light_bump_right(),
            SensorPacket::WallSignal => robot.wall_signal(),
            other => robot.signal(other),
        }
    }

    /// Rotate counter-clockwise in place
    fn rotate(&self, robot: &mut Robot) -> Result<(), ProtocolError> {
        let speed = self.config.search_speed;
        robot.drive_direct(speed.saturating_neg(), speed)
    }

    /// Drive straight until a bumper is pressed
    fn find_wall(&mut self, robot: &mut Robot) -> Result<Phase<()>, ProtocolError> {
        loop {
            if robot.bumps()?.any() {
                return Ok(Phase::Done(()));
            }
            if robot.button_pressed()? {
                return Ok(Phase::Stopped);
            }
            robot.drive_straight(self.config.search_speed)?;
            self.ticks += 1;
            robot.delay(millis(self.config.tick_ms));
        }
    }

    /// Rotate until only the right light bumper sees something
    fn find_obstacle(&mut self, robot: &mut Robot) -> Result<Phase<()>, ProtocolError> {
        while robot.light_bumper()? != self.config.obstacle_pattern {
            self.rotate(robot)?;
            self.ticks += 1;
            if robot.button_pressed()? {
                robot.halt()?;
                return Ok(Phase::Stopped);
            }
            robot.delay(millis(self.config.tick_ms));
        }
        robot.halt()?;
        Ok(Phase::Done(()))
    }

    /// Rotate until the wall sensor reaches the threshold; yields the reference
    fn align(&mut self, robot: &mut Robot) -> Result<Phase<u16>, ProtocolError> {
        let mut wall = self.read_wall(robot)?;
        while wall < self.config.align_threshold {
            self.rotate(robot)?;
            self.ticks += 1;
            if robot.button_pressed()? {
                robot.halt()?;
                return Ok(Phase::Stopped);
            }
            robot.delay(millis(self.config.tick_ms));
            wall = self.read_wall(robot)?;
        }
        robot.halt()?;

        let reference = wall.saturating_sub(self.config.reference_offset);
        info!("wall-follow: aligned at {}, reference {}", wall, reference);
        Ok(Phase::Done(reference))
    }

    fn follow(&mut self, robot: &mut Robot, reference: u16) -> Result<RunSummary, ProtocolError> {
        let mut state = SteeringState::new(
            reference,
            self.controller(),
            WheelVelocities::straight(self.config.base_velocity),
            self.config.max_wheel_speed,
        );

        loop {
            if robot.bumps()?.both() {
                if let Phase::Stopped = self.find_obstacle(robot)? {
                    return Ok(RunSummary::stopped(self.ticks));
                }
                match self.align(robot)? {
                    Phase::Done(reference) if self.config.reset_on_realign => {
                        state.reset(reference)
                    }
                    Phase::Done(reference) => state.set_reference(reference),
                    Phase::Stopped => return Ok(RunSummary::stopped(self.ticks)),
                }
            }

            let measured = self.read_wall(robot)?;
            let (step, v) = state.tick(measured);
            let gains = state.controller().gains();
            robot.drive_direct(v.left, v.right)?;
            self.ticks += 1;
            debug!(
                "wall={} error_p={:.1} error_i={:.1} weighted_p={:.2} weighted_i={:.2} left={} right={}",
                measured,
                step.error_p,
                step.error_i,
                gains.kp * step.error_p,
                gains.ki * step.error_i,
                v.left,
                v.right
            );

            if robot.button_pressed()? {
                robot.halt()?;
                return Ok(RunSummary::stopped(self.ticks));
            }
            robot.delay(millis(self.config.tick_ms));
        }
    }
}

impl Behavior for WallFollow {
    fn name(&self) -> &'static str {
        "wall-follow"
    }

    fn run(&mut self, robot: &mut Robot) -> Result<RunSummary, ProtocolError> {
        self.ticks = 0;

        if let Phase::Stopped = self.find_wall(robot)? {
            robot.halt()?;
            return Ok(RunSummary::stopped(self.ticks));
        }
        let reference = match self.align(robot)? {
            Phase::Done(reference) => reference,
            Phase::Stopped => return Ok(RunSummary::stopped(self.ticks)),
        };
        self.follow(robot, reference)
    }
}
