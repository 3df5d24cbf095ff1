//! Closed-loop control

mod pi;

pub use pi::{PiController, PiGains, PiStep, SteeringState, WheelVelocities};
