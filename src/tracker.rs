//! tracker.rs
//! The tracker object: owns every piece of loop state and runs one control cycle per call.
//!
//! Pipeline per cycle: sample → smooth → estimate error → proportional step → clamp → drive.
//! All state lives in this struct, so independent trackers can coexist and tests can drive
//! one deterministically. Nothing in [`Tracker::cycle`] can fail.

use log::{debug, info};

use crate::actuation::{
    controller::{ProportionalController, Step},
    driver::{ActuatorDriver, Axis},
    position::{ActuatorPosition, PositionManager},
};
use crate::config::{ConfigError, ControlParameters};
use crate::sensing::{
    estimator::{DirectionalError, ErrorEstimator},
    filter::{SmoothedReading, SmoothingFilter},
    sensor::{LightSensor, Sampler, SensorReading},
};

/// Everything that happened in one cycle, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub seq: u64,
    pub raw: SensorReading,
    pub smoothed: SmoothedReading,
    pub error: DirectionalError,
    pub step: Step,
    pub position: ActuatorPosition,
}

pub struct Tracker<S, D> {
    params: ControlParameters,
    sampler: Sampler<S>,
    filter: SmoothingFilter,
    estimator: ErrorEstimator,
    controller: ProportionalController,
    positions: PositionManager,
    driver: D,
    seq: u64,
}

impl<S: LightSensor, D: ActuatorDriver> Tracker<S, D> {
    /// Startup hook: parks both axes at home, seeds the filter from a single sample and
    /// reports ready. Parameter validation is the only thing that can fail.
    pub fn start(params: ControlParameters, sensors: S, driver: D) -> Result<Self, ConfigError> {
        params.validate()?;

        let mut tracker = Self {
            sampler: Sampler::new(sensors),
            filter: SmoothingFilter::new(params.window_size),
            estimator: ErrorEstimator::new(params.dead_band, params.polarity),
            controller: ProportionalController::new(params.gain, params.max_step),
            positions: PositionManager::new(params.pan, params.tilt),
            driver,
            params,
            seq: 0,
        };

        tracker.command();
        let first = tracker.sampler.sample();
        tracker.filter.seed(first);

        let p = tracker.positions.position();
        info!(
            "[Tracker] ready: pan={} tilt={} gain={} dead_band={} max_step={} window={}",
            p.pan,
            p.tilt,
            tracker.params.gain,
            tracker.params.dead_band,
            tracker.params.max_step,
            tracker.params.window_size
        );
        Ok(tracker)
    }

    /// One pass through the pipeline. Commands both axes exactly once.
    pub fn cycle(&mut self) -> CycleReport {
        self.seq += 1;

        let raw = self.sampler.sample();
        self.filter.push(raw);
        let smoothed = self.filter.smoothed();

        let error = self.estimator.estimate(&smoothed);
        let step = self.controller.step(&error);
        let position = self.positions.apply(step);

        self.command();

        debug!(
            "[Tracker] #{} err(v={}, h={}) step(pan={}, tilt={}) -> pan={} tilt={}",
            self.seq, error.vertical, error.horizontal, step.pan, step.tilt, position.pan, position.tilt
        );

        CycleReport { seq: self.seq, raw, smoothed, error, step, position }
    }

    /// Returns both axes to home and restarts smoothing from a fresh sample.
    pub fn recenter(&mut self) -> ActuatorPosition {
        let position = self.positions.reset();
        self.command();
        let reading = self.sampler.sample();
        self.filter.seed(reading);
        info!("[Tracker] re-centered at pan={} tilt={}", position.pan, position.tilt);
        position
    }

    fn command(&mut self) {
        let p = self.positions.position();
        self.driver.set_angle(Axis::Pan, p.pan);
        self.driver.set_angle(Axis::Tilt, p.tilt);
    }
}

impl<S, D> Tracker<S, D> {
    pub fn position(&self) -> ActuatorPosition {
        self.positions.position()
    }

    pub fn at_stop(&self) -> bool {
        self.positions.at_stop()
    }

    pub fn cycles(&self) -> u64 {
        self.seq
    }

    pub fn filter(&self) -> &SmoothingFilter {
        &self.filter
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        self.sampler.sensors_mut()
    }
}
