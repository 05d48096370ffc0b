//! estimator.rs
//! Turns four smoothed intensities into a vertical and a horizontal light error.
//!
//! Half sums are integer means (truncating). With normal polarity a positive vertical
//! error means the light is above, a positive horizontal error means it is to the right.
//! Errors with magnitude strictly below the dead-band are forced to zero.

use crate::config::PolarityConfig;
use crate::sensing::filter::SmoothedReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionalError {
    pub vertical: i32,
    pub horizontal: i32,
}

impl DirectionalError {
    pub fn is_zero(&self) -> bool {
        self.vertical == 0 && self.horizontal == 0
    }
}

/// Hard, hysteresis-free threshold: `|err| < dead_band` becomes 0.
#[inline]
pub fn dead_band(err: i32, band: i32) -> i32 {
    if err.abs() < band { 0 } else { err }
}

#[derive(Debug, Clone, Copy)]
pub struct ErrorEstimator {
    dead_band: i32,
    polarity: PolarityConfig,
}

impl ErrorEstimator {
    pub fn new(dead_band: i32, polarity: PolarityConfig) -> Self {
        Self { dead_band, polarity }
    }

    /// Error before dead-banding, polarity applied.
    pub fn raw_error(&self, s: &SmoothedReading) -> DirectionalError {
        let top = (s.top_left + s.top_right) / 2;
        let bottom = (s.bottom_left + s.bottom_right) / 2;
        let left = (s.top_left + s.bottom_left) / 2;
        let right = (s.top_right + s.bottom_right) / 2;

        DirectionalError {
            vertical: self.polarity.vertical.apply(top - bottom),
            horizontal: self.polarity.horizontal.apply(right - left),
        }
    }

    pub fn estimate(&self, s: &SmoothedReading) -> DirectionalError {
        let raw = self.raw_error(s);
        DirectionalError {
            vertical: dead_band(raw.vertical, self.dead_band),
            horizontal: dead_band(raw.horizontal, self.dead_band),
        }
    }
}
