//! Behaviors
//!
//! Each behavior is one reactive program for the robot, run as a
//! single-threaded poll loop over a [`Robot`]. The stop button is checked
//! once per tick; there is no other cancellation.

mod bump_lights;
mod bump_retreat;
mod card_search;
mod square_lap;
mod wall_follow;

pub use bump_lights::{next_power_color, BumpLights, BumpLightsConfig};
pub use bump_retreat::{wall_to_color, BumpRetreat, BumpRetreatConfig};
pub use card_search::{feet_to_mm, CardSearch, CardSearchConfig};
pub use square_lap::{SquareLap, SquareLapConfig};
pub use wall_follow::{WallFollow, WallFollowConfig};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::RobotConfig;
use crate::protocol::{Mode, ProtocolError, Robot};

/// How a behavior run ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Control ticks executed
    pub ticks: u64,
    /// The run ended because the button was pressed
    pub stopped_by_button: bool,
}

impl RunSummary {
    fn stopped(ticks: u64) -> Self {
        Self {
            ticks,
            stopped_by_button: true,
        }
    }

    fn finished(ticks: u64) -> Self {
        Self {
            ticks,
            stopped_by_button: false,
        }
    }
}

/// A control policy driven over a robot connection
pub trait Behavior {
    fn name(&self) -> &'static str;

    /// Run until finished or stopped by the button.
    ///
    /// The Open Interface is already started; powering down is left to the caller.
    fn run(&mut self, robot: &mut Robot) -> Result<RunSummary, ProtocolError>;
}

/// Behaviors selectable at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BehaviorKind {
    BumpLights,
    BumpRetreat,
    SquareLap,
    WallFollow,
    CardSearch,
}

impl BehaviorKind {
    pub fn create(self, config: &RobotConfig) -> Box<dyn Behavior> {
        match self {
            BehaviorKind::BumpLights => Box::new(BumpLights::new(config.bump_lights.clone())),
            BehaviorKind::BumpRetreat => Box::new(BumpRetreat::new(config.bump_retreat.clone())),
            BehaviorKind::SquareLap => Box::new(SquareLap::new(config.square_lap.clone())),
            BehaviorKind::WallFollow => Box::new(WallFollow::new(config.wall_follow.clone())),
            BehaviorKind::CardSearch => Box::new(CardSearch::new(config.card_search.clone())),
        }
    }
}

/// Start the Open Interface, run `behavior`, then stop the wheels and power down.
///
/// On any error the robot is closed before the error is returned, so the
/// serial handle is never left behind.
pub fn run_session(
    robot: &mut Robot,
    behavior: &mut dyn Behavior,
    mode: Mode,
) -> Result<RunSummary, ProtocolError> {
    info!("Running {}", behavior.name());
    let result = robot.start(mode).and_then(|_| behavior.run(robot));

    match result {
        Ok(summary) => {
            robot.halt()?;
            robot.power_down()?;
            info!(
                "{} finished after {} ticks{}",
                behavior.name(),
                summary.ticks,
                if summary.stopped_by_button {
                    " (button)"
                } else {
                    ""
                }
            );
            Ok(summary)
        }
        Err(e) => {
            warn!("{} aborted: {}", behavior.name(), e);
            robot.close();
            Err(e)
        }
    }
}

pub(crate) fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
