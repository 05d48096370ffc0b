//! driver.rs
//! Interface to the pan/tilt servos.
//!
//! Open loop: the tracker commands an absolute angle already inside the axis's range and
//! trusts that it is reached. There is no feedback path and no error return.

use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Pan,
    Tilt,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        match self {
            Axis::Pan => "Pan",
            Axis::Tilt => "Tilt",
        }
    }
}

pub trait ActuatorDriver {
    fn set_angle(&mut self, axis: Axis, degrees: i32);
}

impl<T: ActuatorDriver + ?Sized> ActuatorDriver for &mut T {
    fn set_angle(&mut self, axis: Axis, degrees: i32) {
        (**self).set_angle(axis, degrees)
    }
}

/// Keeps every command it receives, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    pub commands: Vec<(Axis, i32)>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent angle commanded on `axis`.
    pub fn last(&self, axis: Axis) -> Option<i32> {
        self.commands
            .iter()
            .rev()
            .find(|(a, _)| *a == axis)
            .map(|&(_, deg)| deg)
    }

    pub fn angles(&self, axis: Axis) -> Vec<i32> {
        self.commands
            .iter()
            .filter(|(a, _)| *a == axis)
            .map(|&(_, deg)| deg)
            .collect()
    }
}

impl ActuatorDriver for RecordingDriver {
    fn set_angle(&mut self, axis: Axis, degrees: i32) {
        trace!("[RecordingDriver] {} -> {}", axis.name(), degrees);
        self.commands.push((axis, degrees));
    }
}
