//! controller.rs
//! Proportional step computation for the pan and tilt axes.
//!
//! P-only by choice: no integral or derivative memory, so the controller is a pure function
//! of the current error. Each step is `gain * err` truncated toward zero, then capped to
//! `[-max_step, max_step]` which bounds the angular velocity of the servos.

use crate::sensing::estimator::DirectionalError;

/// Per-cycle angular increment in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Step {
    pub pan: i32,
    pub tilt: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct ProportionalController {
    gain: f32,
    max_step: i32,
}

impl ProportionalController {
    pub fn new(gain: f32, max_step: i32) -> Self {
        Self { gain, max_step: max_step.max(0) }
    }

    #[inline]
    pub fn axis_step(&self, err: i32) -> i32 {
        // float-to-int `as` truncates toward zero and saturates
        let raw = (self.gain * err as f32) as i32;
        raw.clamp(-self.max_step, self.max_step)
    }

    /// Horizontal error drives pan, vertical error drives tilt.
    pub fn step(&self, err: &DirectionalError) -> Step {
        Step {
            pan: self.axis_step(err.horizontal),
            tilt: self.axis_step(err.vertical),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_products_truncate_to_zero() {
        let c = ProportionalController::new(0.015, 3);
        assert_eq!(c.axis_step(40), 0); // 0.6
        assert_eq!(c.axis_step(-40), 0); // -0.6
        assert_eq!(c.axis_step(66), 0); // 0.99
    }

    #[test]
    fn truncation_is_toward_zero_for_negative_errors() {
        let c = ProportionalController::new(0.015, 10);
        assert_eq!(c.axis_step(300), 4); // 4.5
        assert_eq!(c.axis_step(-150), -2); // -2.25
    }

    #[test]
    fn step_is_capped_both_ways() {
        let c = ProportionalController::new(0.015, 3);
        assert_eq!(c.axis_step(1023), 3);
        assert_eq!(c.axis_step(-1023), -3);
        assert_eq!(c.axis_step(i32::MAX), 3);
    }

    #[test]
    fn axes_are_independent() {
        let c = ProportionalController::new(0.05, 3);
        let s = c.step(&DirectionalError { vertical: -40, horizontal: 0 });
        assert_eq!(s, Step { pan: 0, tilt: -2 });
    }

    #[test]
    fn zero_max_step_freezes_motion() {
        let c = ProportionalController::new(1.0, 0);
        assert_eq!(c.axis_step(500), 0);
    }
}
