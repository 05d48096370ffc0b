//! config.rs
//! Deployment configuration: control parameters, cycle timing, simulated rig and output paths.
//!
//! Loaded from TOML once at startup. If the file is missing, the embedded
//! `tracker.toml.example` is used instead. Everything here is read-only after the
//! tracker is built.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;
use log::{info, warn};

/// Upper end of the raw sensor scale (10-bit ADC).
pub const RANGE_MAX: u16 = 1023;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Sign convention of one error axis.
///
/// With `Normal`, a brighter top half gives a positive vertical error and a brighter right
/// half gives a positive horizontal error. Mounting a sensor head rotated or mirrored flips
/// that, so each axis can be inverted independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Normal,
    Inverted,
}

impl Polarity {
    #[inline]
    pub fn apply(self, err: i32) -> i32 {
        match self {
            Polarity::Normal => err,
            Polarity::Inverted => -err,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolarityConfig {
    #[serde(default)]
    pub vertical: Polarity,
    #[serde(default)]
    pub horizontal: Polarity,
}

/// Mechanical stops of one axis plus the safe angle it is parked at on startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub min: i32,
    pub max: i32,
    pub home: i32,
}

impl AxisLimits {
    pub const fn new(min: i32, max: i32, home: i32) -> Self {
        Self { min, max, home }
    }

    /// Stops in ascending order; swapped limits still describe the same range of travel.
    #[inline]
    fn bounds(&self) -> (i32, i32) {
        (self.min.min(self.max), self.min.max(self.max))
    }

    /// Saturating clamp into `[min, max]`.
    #[inline]
    pub fn clamp(&self, angle: i32) -> i32 {
        let (lo, hi) = self.bounds();
        angle.clamp(lo, hi)
    }

    #[inline]
    pub fn at_stop(&self, angle: i32) -> bool {
        let (lo, hi) = self.bounds();
        angle <= lo || angle >= hi
    }

    fn validate(&self, axis: &str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::Invalid(format!(
                "{} limits inverted: min {} > max {}",
                axis, self.min, self.max
            )));
        }
        if self.home < self.min || self.home > self.max {
            return Err(ConfigError::Invalid(format!(
                "{} home {} outside [{}, {}]",
                axis, self.home, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Tuning bundle for the control loop. Fixed at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlParameters {
    pub gain: f32,
    pub dead_band: i32,
    pub max_step: i32,
    pub window_size: usize,
    pub pan: AxisLimits,
    pub tilt: AxisLimits,
    #[serde(default)]
    pub polarity: PolarityConfig,
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            gain: 0.015,
            dead_band: 30,
            max_step: 3,
            window_size: 5,
            pan: AxisLimits::new(10, 170, 90),
            tilt: AxisLimits::new(20, 160, 90),
            polarity: PolarityConfig::default(),
        }
    }
}

impl ControlParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gain.is_finite() || self.gain < 0.0 {
            return Err(ConfigError::Invalid(format!("gain must be finite and >= 0, got {}", self.gain)));
        }
        if self.dead_band < 0 {
            return Err(ConfigError::Invalid(format!("dead_band must be >= 0, got {}", self.dead_band)));
        }
        if self.max_step < 0 {
            return Err(ConfigError::Invalid(format!("max_step must be >= 0, got {}", self.max_step)));
        }
        if self.window_size == 0 {
            return Err(ConfigError::Invalid("window_size must be at least 1".into()));
        }
        self.pan.validate("pan")?;
        self.tilt.validate("tilt")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Period between cycle releases.
    pub period_ms: u64,
    /// Number of cycles per run; 0 runs until `duration_secs` is up.
    #[serde(default)]
    pub cycles: u64,
    /// Wall-clock budget per run. A run ends at whichever limit is hit first.
    #[serde(default)]
    pub duration_secs: Option<u64>,
    /// Core to pin the tracking thread to, if any.
    #[serde(default)]
    pub pin_core: Option<usize>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self { period_ms: 20, cycles: 1_500, duration_secs: None, pin_core: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Ambient intensity with the sun dead ahead.
    pub ambient: u16,
    /// Half-width (degrees) of the region where shading is proportional to offset.
    pub field_of_view_deg: f32,
    /// Uniform noise amplitude added to each raw read.
    pub noise: u16,
    /// Probability per read of a single-sample spike to full scale.
    pub spike_probability: f64,
    pub sun_azimuth_deg: f32,
    pub sun_elevation_deg: f32,
    /// Sun motion per cycle.
    pub azimuth_drift_deg: f32,
    pub elevation_drift_deg: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            ambient: 600,
            field_of_view_deg: 45.0,
            noise: 8,
            spike_probability: 0.002,
            sun_azimuth_deg: 130.0,
            sun_elevation_deg: 55.0,
            azimuth_drift_deg: 0.01,
            elevation_drift_deg: 0.004,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub data_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { data_dir: "data".into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub control: ControlParameters,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Loads `path` if it exists, otherwise the embedded example configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = if path.exists() {
            let content = fs::read_to_string(path)?;
            let config = Self::from_toml(&content)?;
            info!("Loaded configuration from {:?}", path);
            config
        } else {
            let config = Self::from_toml(include_str!("../tracker.toml.example"))?;
            warn!("{:?} not found, using embedded default configuration", path);
            config
        };
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control.validate()?;
        if self.cycle.period_ms == 0 {
            return Err(ConfigError::Invalid("cycle.period_ms must be > 0".into()));
        }
        match (self.cycle.cycles, self.cycle.duration_secs) {
            (_, Some(0)) => {
                return Err(ConfigError::Invalid("cycle.duration_secs must be > 0".into()));
            }
            (0, None) => {
                return Err(ConfigError::Invalid(
                    "cycle.cycles = 0 needs cycle.duration_secs to end the run".into(),
                ));
            }
            _ => {}
        }
        if !(self.simulation.field_of_view_deg > 0.0) {
            return Err(ConfigError::Invalid("simulation.field_of_view_deg must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.simulation.spike_probability) {
            return Err(ConfigError::Invalid("simulation.spike_probability must be in [0, 1]".into()));
        }
        Ok(())
    }
}
