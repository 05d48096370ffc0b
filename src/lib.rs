//! # Dual-axis solar tracker
//!
//! Closed-loop light seeking for a pan/tilt rig with four light-dependent resistors.
//!
//! One control cycle: sample 4 LDRs → moving-average filter → directional error with dead-band
//! → bounded proportional step → clamped pan/tilt position → actuator command.
//!
//! - [`tracker`]: the cycle itself, over any [`sensing::sensor::LightSensor`] and
//!   [`actuation::driver::ActuatorDriver`].
//! - [`scheduler`]: fixed-period release of cycles with deadline tracking.
//! - [`simulation`]: a host-side rig with a drifting sun, used by the binary and tests.
//! - [`experiment`]: single runs and gain sweeps with CSV export.

pub mod actuation;
pub mod config;
pub mod experiment;
pub mod scheduler;
pub mod sensing;
pub mod simulation;
pub mod tracker;
pub mod utils;
