//! Proportional-integral steering
//!
//! The controller compares a reference wall reading with the measured one
//! and steers by moving the difference between the two wheel velocities:
//!
//! ```text
//! error_p  = reference - measured
//! error_i += error_p
//! correction = kp * error_p + ki * error_i
//! right -= correction; left += correction
//! ```

use serde::{Deserialize, Serialize};

/// Controller gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PiGains {
    pub kp: f64,
    pub ki: f64,
}

impl Default for PiGains {
    fn default() -> Self {
        Self { kp: 0.1, ki: 0.01 }
    }
}

/// Result of one controller update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiStep {
    pub error_p: f64,
    pub error_i: f64,
    pub correction: f64,
}

/// PI controller; the accumulated error is its only state
#[derive(Debug, Clone)]
pub struct PiController {
    gains: PiGains,
    error_i: f64,
    /// Symmetric clamp on the accumulated error, off when `None`
    integral_limit: Option<f64>,
}

impl PiController {
    pub fn new(gains: PiGains) -> Self {
        Self {
            gains,
            error_i: 0.0,
            integral_limit: None,
        }
    }

    /// Clamp the accumulated error to `[-limit, limit]`
    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit.abs());
        self
    }

    pub fn gains(&self) -> PiGains {
        self.gains
    }

    pub fn error_i(&self) -> f64 {
        self.error_i
    }

    pub fn reset(&mut self) {
        self.error_i = 0.0;
    }

    pub fn update(&mut self, reference: f64, measured: f64) -> PiStep {
        let error_p = reference - measured;
        self.error_i += error_p;
        if let Some(limit) = self.integral_limit {
            self.error_i = self.error_i.clamp(-limit, limit);
        }

        PiStep {
            error_p,
            error_i: self.error_i,
            correction: self.gains.kp * error_p + self.gains.ki * self.error_i,
        }
    }
}

/// Wheel velocities in mm/s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WheelVelocities {
    pub left: i16,
    pub right: i16,
}

impl WheelVelocities {
    pub const fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    pub const fn straight(velocity: i16) -> Self {
        Self::new(velocity, velocity)
    }
}

/// Controller state for one wall-following run
#[derive(Debug, Clone)]
pub struct SteeringState {
    reference: u16,
    controller: PiController,
    velocities: WheelVelocities,
    base: WheelVelocities,
    max_speed: i16,
}

impl SteeringState {
    /// Start at `base` velocities, holding `reference`.
    ///
    /// Wheel velocities never leave `[-max_speed, max_speed]`.
    pub fn new(
        reference: u16,
        controller: PiController,
        base: WheelVelocities,
        max_speed: i16,
    ) -> Self {
        let max_speed = max_speed.saturating_abs();
        let base = WheelVelocities::new(
            base.left.clamp(-max_speed, max_speed),
            base.right.clamp(-max_speed, max_speed),
        );
        Self {
            reference,
            controller,
            velocities: base,
            base,
            max_speed,
        }
    }

    pub fn reference(&self) -> u16 {
        self.reference
    }

    pub fn velocities(&self) -> WheelVelocities {
        self.velocities
    }

    pub fn controller(&self) -> &PiController {
        &self.controller
    }

    /// One control tick: update the controller and move the wheels apart
    /// by the correction.
    ///
    /// The new velocities are truncated toward zero like the integer wheel
    /// speeds on the wire, then saturated at the speed limit instead of
    /// wrapping.
    pub fn tick(&mut self, measured: u16) -> (PiStep, WheelVelocities) {
        let step = self
            .controller
            .update(self.reference as f64, measured as f64);

        let limit = self.max_speed as f64;
        let right = (self.velocities.right as f64 - step.correction).trunc();
        let left = (self.velocities.left as f64 + step.correction).trunc();
        // `as` from f64 saturates and maps NaN to 0
        self.velocities = WheelVelocities::new(
            left.clamp(-limit, limit) as i16,
            right.clamp(-limit, limit) as i16,
        );

        (step, self.velocities)
    }

    /// Hold a new reference; the integral and the current velocities carry over
    pub fn set_reference(&mut self, reference: u16) {
        self.reference = reference;
    }

    /// Start over from a new reference: clears the integral and restores the
    /// base velocities
    pub fn reset(&mut self, reference: u16) {
        self.reference = reference;
        self.controller.reset();
        self.velocities = self.base;
    }
}
