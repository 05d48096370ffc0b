// Sensing side of the loop: raw light sensor sampling, per-sensor smoothing and
// directional error estimation with dead-banding.
// Everything here runs inside one control cycle and holds no hardware state.

pub mod sensor;
pub mod filter;
pub mod estimator;
