//! position.rs
//! Absolute pan/tilt angles, the only state that survives from one cycle to the next.
//!
//! Steps are accumulated and clamped to each axis's mechanical stops. The clamp saturates:
//! an axis parked on a stop stays there while the error keeps pushing into it and moves
//! again as soon as the error reverses. Overshoot is dropped silently.

use crate::actuation::controller::Step;
use crate::config::AxisLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorPosition {
    pub pan: i32,
    pub tilt: i32,
}

#[derive(Debug, Clone)]
pub struct PositionManager {
    pan_limits: AxisLimits,
    tilt_limits: AxisLimits,
    position: ActuatorPosition,
}

impl PositionManager {
    /// Starts at each axis's home angle (clamped, in case home lies outside the stops).
    pub fn new(pan_limits: AxisLimits, tilt_limits: AxisLimits) -> Self {
        Self {
            pan_limits,
            tilt_limits,
            position: ActuatorPosition {
                pan: pan_limits.clamp(pan_limits.home),
                tilt: tilt_limits.clamp(tilt_limits.home),
            },
        }
    }

    pub fn apply(&mut self, step: Step) -> ActuatorPosition {
        self.position.pan = self.pan_limits.clamp(self.position.pan.saturating_add(step.pan));
        self.position.tilt = self.tilt_limits.clamp(self.position.tilt.saturating_add(step.tilt));
        self.position
    }

    /// Back to the home angles.
    pub fn reset(&mut self) -> ActuatorPosition {
        *self = Self::new(self.pan_limits, self.tilt_limits);
        self.position
    }

    pub fn position(&self) -> ActuatorPosition {
        self.position
    }

    /// True if either axis currently sits on a mechanical stop.
    pub fn at_stop(&self) -> bool {
        self.pan_limits.at_stop(self.position.pan) || self.tilt_limits.at_stop(self.position.tilt)
    }
}
