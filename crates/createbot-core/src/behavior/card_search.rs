//! Strafe over an area looking for a bright card under the front-left cliff sensor

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{millis, Behavior, RunSummary};
use crate::protocol::{led, ProtocolError, Robot, Song};

const FEET_PER_MM: f64 = 0.003_280_84;

/// Convert feet to millimetres
pub fn feet_to_mm(feet: f64) -> f64 {
    feet / FEET_PER_MM
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardSearchConfig {
    /// Straight-line speed, mm/s
    pub speed: i16,
    /// Wheel speed while rotating in place, mm/s
    pub rotate_speed: i16,
    /// Rotation duration; tuned for a quarter turn
    pub rotate_ms: u64,
    /// Rise in the cliff signal between samples that means a card
    pub card_threshold: i32,
    /// Number of strafe passes
    pub passes: u32,
    /// Pause before and after each leg
    pub settle_ms: u64,
    pub setup_leg_ft: f64,
    pub long_leg_ft: f64,
    pub short_leg_ft: f64,
    pub play_song: bool,
}

impl Default for CardSearchConfig {
    fn default() -> Self {
        Self {
            speed: 100,
            rotate_speed: 100,
            rotate_ms: 1585,
            card_threshold: 150,
            passes: 4,
            settle_ms: 100,
            setup_leg_ft: 2.0,
            long_leg_ft: 4.0,
            short_leg_ft: 0.5,
            play_song: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    Left,
    Right,
}

/// One step of the search pattern
#[derive(Debug, Clone, Copy, PartialEq)]
enum Leg {
    Forward(f64),
    Rotate(Turn),
}

pub struct CardSearch {
    config: CardSearchConfig,
    ticks: u64,
    stopped: bool,
    cards_seen: u64,
}

impl CardSearch {
    pub fn new(config: CardSearchConfig) -> Self {
        Self {
            config,
            ticks: 0,
            stopped: false,
            cards_seen: 0,
        }
    }

    /// Ticks in which the cliff signal rose past the threshold in the last run
    pub fn cards_seen(&self) -> u64 {
        self.cards_seen
    }

    fn setup(&self) -> Vec<Leg> {
        let leg = self.config.setup_leg_ft;
        vec![
            Leg::Forward(leg),
            Leg::Rotate(Turn::Left),
            Leg::Forward(leg),
            Leg::Rotate(Turn::Left),
        ]
    }

    fn pass(&self) -> Vec<Leg> {
        let long = self.config.long_leg_ft;
        let short = self.config.short_leg_ft;
        vec![
            Leg::Forward(long),
            Leg::Rotate(Turn::Left),
            Leg::Forward(short),
            Leg::Rotate(Turn::Left),
            Leg::Forward(long),
            Leg::Rotate(Turn::Right),
            Leg::Forward(short),
            Leg::Rotate(Turn::Right),
        ]
    }

    fn perform_leg(&mut self, robot: &mut Robot, leg: Leg) -> Result<(), ProtocolError> {
        if self.stopped {
            return Ok(());
        }
        match leg {
            Leg::Forward(feet) => self.drive_distance(robot, feet),
            Leg::Rotate(turn) => self.rotate(robot, turn),
        }
    }

    fn rotate(&mut self, robot: &mut Robot, turn: Turn) -> Result<(), ProtocolError> {
        let speed = self.config.rotate_speed;
        match turn {
            Turn::Left => robot.drive_direct(speed.saturating_neg(), speed)?,
            Turn::Right => robot.drive_direct(speed, speed.saturating_neg())?,
        }
        robot.delay(millis(self.config.rotate_ms));
        robot.drive_direct(0, 0)
    }

    /// Add the distance travelled since the last read; true once the target is reached
    fn advance(
        &mut self,
        robot: &mut Robot,
        traveled: &mut i32,
        target: i32,
    ) -> Result<bool, ProtocolError> {
        *traveled += i32::from(robot.distance()?);
        if *traveled >= target {
            robot.drive_direct(0, 0)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn drive_distance(&mut self, robot: &mut Robot, feet: f64) -> Result<(), ProtocolError> {
        let target = feet_to_mm(feet) as i32;
        let mut cliff = i32::from(robot.cliff_front_left()?);
        robot.delay(millis(self.config.settle_ms));

        // Discard whatever the odometer accumulated before this leg
        robot.distance()?;
        let mut traveled = 0i32;
        debug!("card-search: driving {} mm", target);
        robot.drive_straight(self.config.speed)?;

        // Distance is re-read between every sensor query so a leg never overshoots by a full tick
        while traveled < target && !self.stopped {
            if self.advance(robot, &mut traveled, target)? {
                break;
            }

            let previous = cliff;
            cliff = i32::from(robot.cliff_front_left()?);
            if self.advance(robot, &mut traveled, target)? {
                break;
            }

            if cliff - previous > self.config.card_threshold {
                self.cards_seen += 1;
                debug!("card-search: cliff signal rose {} -> {}", previous, cliff);
                robot.set_leds(0, led::GREEN, led::FULL_INTENSITY)?;
            } else {
                robot.set_leds(0, led::RED, led::FULL_INTENSITY)?;
            }
            if self.advance(robot, &mut traveled, target)? {
                break;
            }

            self.ticks += 1;
            self.stopped = robot.button_pressed()?;
            if self.advance(robot, &mut traveled, target)? {
                break;
            }
        }

        robot.drive_direct(0, 0)?;
        robot.delay(millis(self.config.settle_ms));
        Ok(())
    }
}

impl Behavior for CardSearch {
    fn name(&self) -> &'static str {
        "card-search"
    }

    fn run(&mut self, robot: &mut Robot) -> Result<RunSummary, ProtocolError> {
        self.ticks = 0;
        self.stopped = false;
        self.cards_seen = 0;

        robot.set_leds(0, led::RED, led::FULL_INTENSITY)?;

        for leg in self.setup() {
            self.perform_leg(robot, leg)?;
        }

        let mut passes = 0;
        while !self.stopped && passes < self.config.passes {
            info!("card-search: pass {}", passes + 1);
            for leg in self.pass() {
                self.perform_leg(robot, leg)?;
            }
            passes += 1;
        }

        robot.halt()?;
        if self.config.play_song {
            robot.perform(&Song::search_complete())?;
        }

        Ok(if self.stopped {
            RunSummary::stopped(self.ticks)
        } else {
            RunSummary::finished(self.ticks)
        })
    }
}
