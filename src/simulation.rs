//! simulation.rs
//! Host-side stand-in for the tracker hardware: four LDRs under a slowly moving sun and two
//! open-loop servos.
//!
//! The sensors and servos are separate handles onto one shared [`RigState`], so the light
//! each quadrant sees depends on where the servos were last pointed.
//!
//! Light model: every quadrant starts from `ambient` and is shaded by the angular offset
//! between sun and pointing direction, normalised by the field of view and saturating at
//! ±1. The side facing the sun brightens, the far side darkens. Uniform noise is added per
//! read and, rarely, a single read spikes to full scale.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::actuation::driver::{ActuatorDriver, Axis};
use crate::config::{SimulationConfig, RANGE_MAX};
use crate::sensing::sensor::{LightSensor, Quadrant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigState {
    pub sun_azimuth: f32,
    pub sun_elevation: f32,
    pub pan: i32,
    pub tilt: i32,
}

impl RigState {
    /// Sun direction minus pointing direction, in degrees (pan, tilt).
    pub fn offset(&self) -> (f32, f32) {
        (self.sun_azimuth - self.pan as f32, self.sun_elevation - self.tilt as f32)
    }
}

type SharedRig = Arc<Mutex<RigState>>;

fn lock(rig: &SharedRig) -> MutexGuard<'_, RigState> {
    match rig.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Clone)]
pub struct SimulatedRig {
    state: SharedRig,
    config: SimulationConfig,
}

impl SimulatedRig {
    /// Servos start at `(pan, tilt)`; the sun at the configured position.
    pub fn new(config: SimulationConfig, pan: i32, tilt: i32) -> Self {
        let state = RigState {
            sun_azimuth: config.sun_azimuth_deg,
            sun_elevation: config.sun_elevation_deg,
            pan,
            tilt,
        };
        Self { state: Arc::new(Mutex::new(state)), config }
    }

    pub fn sensors(&self) -> SimulatedSensors {
        SimulatedSensors {
            rig: self.state.clone(),
            config: self.config.clone(),
            rng: StdRng::seed_from_u64(self.config.seed),
        }
    }

    pub fn servos(&self) -> SimulatedServos {
        SimulatedServos { rig: self.state.clone() }
    }

    /// Moves the sun by one cycle's drift.
    pub fn advance(&self) {
        let mut s = lock(&self.state);
        s.sun_azimuth += self.config.azimuth_drift_deg;
        s.sun_elevation += self.config.elevation_drift_deg;
    }

    /// Places the sun directly; used to simulate a step change (e.g. a cleared obstruction).
    pub fn set_sun(&self, azimuth: f32, elevation: f32) {
        let mut s = lock(&self.state);
        s.sun_azimuth = azimuth;
        s.sun_elevation = elevation;
    }

    pub fn snapshot(&self) -> RigState {
        *lock(&self.state)
    }
}

/// The four LDR channels of a [`SimulatedRig`].
pub struct SimulatedSensors {
    rig: SharedRig,
    config: SimulationConfig,
    rng: StdRng,
}

impl SimulatedSensors {
    /// Noise-free intensity of `channel` for the given rig state.
    pub fn ideal(config: &SimulationConfig, state: &RigState, channel: Quadrant) -> f32 {
        let (d_pan, d_tilt) = state.offset();
        let bias_h = (d_pan / config.field_of_view_deg).clamp(-1.0, 1.0);
        let bias_v = (d_tilt / config.field_of_view_deg).clamp(-1.0, 1.0);
        let sx = if channel.is_right() { 1.0 } else { -1.0 };
        let sy = if channel.is_top() { 1.0 } else { -1.0 };
        config.ambient as f32 * (1.0 + 0.5 * (sx * bias_h + sy * bias_v))
    }
}

impl LightSensor for SimulatedSensors {
    fn read(&mut self, channel: Quadrant) -> u16 {
        let state = *lock(&self.rig);

        if self.config.spike_probability > 0.0 && self.rng.random_bool(self.config.spike_probability) {
            return RANGE_MAX;
        }

        let noise = self.config.noise as f32;
        let jitter = if noise > 0.0 { self.rng.random_range(-noise..=noise) } else { 0.0 };
        let level = Self::ideal(&self.config, &state, channel) + jitter;
        level.clamp(0.0, RANGE_MAX as f32) as u16
    }
}

/// The two servos of a [`SimulatedRig`]. Commanded angles are reached instantly.
pub struct SimulatedServos {
    rig: SharedRig,
}

impl ActuatorDriver for SimulatedServos {
    fn set_angle(&mut self, axis: Axis, degrees: i32) {
        let mut s = lock(&self.rig);
        match axis {
            Axis::Pan => s.pan = degrees,
            Axis::Tilt => s.tilt = degrees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> SimulationConfig {
        SimulationConfig { noise: 0, spike_probability: 0.0, ..SimulationConfig::default() }
    }

    #[test]
    fn sun_dead_ahead_reads_uniform() {
        let mut cfg = quiet();
        cfg.sun_azimuth_deg = 90.0;
        cfg.sun_elevation_deg = 90.0;
        let rig = SimulatedRig::new(cfg.clone(), 90, 90);
        let mut sensors = rig.sensors();
        for q in Quadrant::ALL {
            assert_eq!(sensors.read(q), cfg.ambient);
        }
    }

    #[test]
    fn sun_to_the_right_brightens_right_column() {
        let mut cfg = quiet();
        cfg.sun_azimuth_deg = 120.0;
        cfg.sun_elevation_deg = 90.0;
        let rig = SimulatedRig::new(cfg, 90, 90);
        let mut sensors = rig.sensors();
        assert!(sensors.read(Quadrant::TopRight) > sensors.read(Quadrant::TopLeft));
        assert!(sensors.read(Quadrant::BottomRight) > sensors.read(Quadrant::BottomLeft));
    }

    #[test]
    fn servos_move_the_shared_pointing_direction() {
        let rig = SimulatedRig::new(quiet(), 90, 90);
        let mut servos = rig.servos();
        servos.set_angle(Axis::Pan, 100);
        servos.set_angle(Axis::Tilt, 40);
        let s = rig.snapshot();
        assert_eq!((s.pan, s.tilt), (100, 40));
    }

    #[test]
    fn reads_stay_in_range_with_noise_and_spikes() {
        let cfg = SimulationConfig { noise: 200, spike_probability: 0.2, ..SimulationConfig::default() };
        let rig = SimulatedRig::new(cfg, 10, 20);
        let mut sensors = rig.sensors();
        for _ in 0..1_000 {
            for q in Quadrant::ALL {
                assert!(sensors.read(q) <= RANGE_MAX);
            }
        }
    }

    #[test]
    fn advance_applies_drift() {
        let cfg = SimulationConfig { azimuth_drift_deg: 0.5, elevation_drift_deg: -0.25, ..quiet() };
        let rig = SimulatedRig::new(cfg.clone(), 90, 90);
        rig.advance();
        rig.advance();
        let s = rig.snapshot();
        assert!((s.sun_azimuth - (cfg.sun_azimuth_deg + 1.0)).abs() < 1e-4);
        assert!((s.sun_elevation - (cfg.sun_elevation_deg - 0.5)).abs() < 1e-4);
    }
}
