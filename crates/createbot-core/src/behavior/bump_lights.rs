//! Bump-reactive LEDs with a fading power light

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{millis, Behavior, RunSummary};
use crate::protocol::{led, ProtocolError, Robot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BumpLightsConfig {
    /// Length of one color step
    pub cycle_ms: u64,
    /// Bumper poll interval within a cycle
    pub poll_ms: u64,
    /// Amount the power color drops per cycle
    pub color_step: u8,
    /// Stop after this many cycles; run until the button otherwise
    pub max_cycles: Option<u64>,
}

impl Default for BumpLightsConfig {
    fn default() -> Self {
        Self {
            cycle_ms: 1000,
            poll_ms: 100,
            color_step: 16,
            max_cycles: None,
        }
    }
}

/// Next power-LED color: step down, land on zero, then wrap to full red
pub fn next_power_color(color: u8, step: u8) -> u8 {
    if color > step {
        color - step
    } else if color > 0 {
        0
    } else {
        led::RED
    }
}

/// Lights the LEDs matching the pressed bumpers while the power LED fades
/// from red to green and starts over
pub struct BumpLights {
    config: BumpLightsConfig,
    color: u8,
}

impl BumpLights {
    pub fn new(config: BumpLightsConfig) -> Self {
        Self {
            config,
            color: led::RED,
        }
    }

    pub fn color(&self) -> u8 {
        self.color
    }
}

impl Behavior for BumpLights {
    fn name(&self) -> &'static str {
        "bump-lights"
    }

    fn run(&mut self, robot: &mut Robot) -> Result<RunSummary, ProtocolError> {
        let polls = (self.config.cycle_ms / self.config.poll_ms.max(1)).max(1);
        let mut ticks = 0;
        let mut cycles = 0;

        robot.set_leds(0, self.color, led::FULL_INTENSITY)?;

        loop {
            if self.config.max_cycles.is_some_and(|max| cycles >= max) {
                return Ok(RunSummary::finished(ticks));
            }

            for _ in 0..polls {
                let bumps = robot.bumps()?;
                let bits = if bumps.both() {
                    led::CHECK_ROBOT | led::DEBRIS
                } else if bumps.left() {
                    led::CHECK_ROBOT
                } else if bumps.right() {
                    led::DEBRIS
                } else {
                    0
                };
                if bits != 0 {
                    robot.set_leds(bits, self.color, led::FULL_INTENSITY)?;
                }
                robot.delay(millis(self.config.poll_ms));
                ticks += 1;
            }

            self.color = next_power_color(self.color, self.config.color_step);
            debug!("bump-lights: power color {}", self.color);
            robot.set_leds(0, self.color, led::FULL_INTENSITY)?;
            cycles += 1;

            if robot.button_pressed()? {
                return Ok(RunSummary::stopped(ticks));
            }
        }
    }
}
