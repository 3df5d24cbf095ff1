//! Back away from obstacles, showing wall proximity on the power LED

use serde::{Deserialize, Serialize};

use super::{millis, Behavior, RunSummary};
use crate::protocol::{led, ProtocolError, Robot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BumpRetreatConfig {
    pub tick_ms: u64,
    /// Reverse velocity in mm/s (negative)
    pub reverse_speed: i16,
    /// Radius of the reversing arc away from a single bumper, mm
    pub turn_radius: i16,
    /// Wall reading that maps to full red
    pub wall_full_scale: u16,
}

impl Default for BumpRetreatConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            reverse_speed: -500,
            turn_radius: 1000,
            wall_full_scale: 1023,
        }
    }
}

/// Map a wall reading onto the power LED: green far away, red at the wall
pub fn wall_to_color(wall: u16, full_scale: u16) -> u8 {
    if full_scale == 0 {
        return led::RED;
    }
    let ratio = wall.min(full_scale) as f64 / full_scale as f64;
    (ratio * 255.0) as u8
}

pub struct BumpRetreat {
    config: BumpRetreatConfig,
}

impl BumpRetreat {
    pub fn new(config: BumpRetreatConfig) -> Self {
        Self { config }
    }
}

impl Behavior for BumpRetreat {
    fn name(&self) -> &'static str {
        "bump-retreat"
    }

    fn run(&mut self, robot: &mut Robot) -> Result<RunSummary, ProtocolError> {
        let cfg = &self.config;
        let mut ticks = 0;

        robot.set_leds(0, led::RED, led::FULL_INTENSITY)?;

        loop {
            let wall = robot.wall_signal()?;
            robot.set_leds(0, wall_to_color(wall, cfg.wall_full_scale), led::FULL_INTENSITY)?;

            let bumps = robot.bumps()?;
            if bumps.both() {
                robot.drive_straight(cfg.reverse_speed)?;
            } else if bumps.right() {
                // Positive radius curves left, away from the right bumper
                robot.drive(cfg.reverse_speed, cfg.turn_radius)?;
            } else if bumps.left() {
                robot.drive(cfg.reverse_speed, cfg.turn_radius.saturating_neg())?;
            } else {
                robot.halt()?;
            }
            ticks += 1;

            if robot.button_pressed()? {
                return Ok(RunSummary::stopped(ticks));
            }
            robot.delay(millis(cfg.tick_ms));
        }
    }
}
