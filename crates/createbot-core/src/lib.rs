//! # Createbot Core Library
//!
//! Drives an iRobot Create over its Open Interface serial protocol.
//!
//! This library provides:
//! - Open Interface command encoding and sensor decoding
//! - A serial connection with bounded-wait reads
//! - A PI steering controller for wall following
//! - The robot behaviors, each runnable against real hardware or a simulator
//!
//! ## Example
//!
//! ```rust,ignore
//! use createbot_core::prelude::*;
//!
//! let config = RobotConfig::default();
//! let mut robot = Robot::open(&config.connection)?;
//! let mut behavior = BehaviorKind::WallFollow.create(&config);
//! run_session(&mut robot, behavior.as_mut(), config.connection.mode)?;
//! ```

pub mod behavior;
pub mod config;
pub mod control;
pub mod protocol;
pub mod sim;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::behavior::{run_session, Behavior, BehaviorKind, RunSummary};
    pub use crate::config::{ConfigError, RobotConfig};
    pub use crate::control::{PiController, PiGains, SteeringState, WheelVelocities};
    pub use crate::protocol::{
        BumpState, ConnectionConfig, Mode, ProtocolError, Robot, SensorPacket, Song, Transport,
    };
    pub use crate::sim::SimulatedCreate;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
