//! Drive a square by time, pausing while bumped

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{millis, Behavior, RunSummary};
use crate::protocol::codec::RADIUS_TURN_CCW;
use crate::protocol::{ProtocolError, Robot, Song};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquareLapConfig {
    pub sides: u32,
    /// Ticks of straight driving per side
    pub ticks_per_side: u32,
    pub tick_ms: u64,
    /// Straight-line speed, mm/s
    pub speed: i16,
    /// Velocity and radius of the corner turn
    pub turn_velocity: i16,
    pub turn_radius: i16,
    /// Corner turn duration; tuned for a quarter turn
    pub turn_ms: u64,
    /// Re-check interval while a bumper is pressed
    pub bump_wait_ms: u64,
    pub play_song: bool,
}

impl Default for SquareLapConfig {
    fn default() -> Self {
        Self {
            sides: 4,
            ticks_per_side: 100,
            tick_ms: 100,
            speed: 100,
            turn_velocity: 185,
            turn_radius: RADIUS_TURN_CCW,
            turn_ms: 1000,
            bump_wait_ms: 100,
            play_song: true,
        }
    }
}

pub struct SquareLap {
    config: SquareLapConfig,
}

impl SquareLap {
    pub fn new(config: SquareLapConfig) -> Self {
        Self { config }
    }
}

impl Behavior for SquareLap {
    fn name(&self) -> &'static str {
        "square-lap"
    }

    fn run(&mut self, robot: &mut Robot) -> Result<RunSummary, ProtocolError> {
        let cfg = &self.config;
        let mut ticks = 0;
        let mut stopped = false;

        for side in 0..cfg.sides {
            debug!("square-lap: side {}", side + 1);
            for _ in 0..cfg.ticks_per_side {
                // Hold still until the obstacle is gone
                while robot.bumps()?.any() {
                    robot.drive(0, 0)?;
                    robot.delay(millis(cfg.bump_wait_ms));
                }

                robot.drive_straight(cfg.speed)?;
                ticks += 1;

                if robot.button_pressed()? {
                    stopped = true;
                    break;
                }
                robot.delay(millis(cfg.tick_ms));
            }

            robot.drive(cfg.turn_velocity, cfg.turn_radius)?;
            robot.delay(millis(cfg.turn_ms));
            robot.drive(0, 0)?;

            // The corner in progress is still finished after a button press
            if stopped {
                break;
            }
        }

        robot.halt()?;
        if cfg.play_song {
            robot.perform(&Song::lap_complete())?;
        }

        Ok(if stopped {
            RunSummary::stopped(ticks)
        } else {
            RunSummary::finished(ticks)
        })
    }
}
