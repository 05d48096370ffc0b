//! sensor.rs
//! Samples the four light-dependent resistors arranged in a 2x2 quadrant around the panel.
//! - Raw values are passed through unvalidated; out-of-range or noisy reads are left to the filter
//! - Polarity: brighter light reads as a larger number (wiring convention, fixed per process)

use log::trace;

/// Position of a sensor in the quadrant grid, as seen looking out from the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// Index into per-quadrant arrays.
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Quadrant::TopLeft => 0,
            Quadrant::TopRight => 1,
            Quadrant::BottomLeft => 2,
            Quadrant::BottomRight => 3,
        }
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Quadrant::TopLeft | Quadrant::TopRight)
    }

    pub fn is_right(&self) -> bool {
        matches!(self, Quadrant::TopRight | Quadrant::BottomRight)
    }
}

/// Four intensities captured in the same cycle. Immutable once captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorReading {
    pub top_left: u16,
    pub top_right: u16,
    pub bottom_left: u16,
    pub bottom_right: u16,
}

impl SensorReading {
    pub const fn new(top_left: u16, top_right: u16, bottom_left: u16, bottom_right: u16) -> Self {
        Self { top_left, top_right, bottom_left, bottom_right }
    }

    /// Same intensity on all four channels.
    pub const fn uniform(value: u16) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn get(&self, quadrant: Quadrant) -> u16 {
        match quadrant {
            Quadrant::TopLeft => self.top_left,
            Quadrant::TopRight => self.top_right,
            Quadrant::BottomLeft => self.bottom_left,
            Quadrant::BottomRight => self.bottom_right,
        }
    }

    pub fn as_array(&self) -> [u16; 4] {
        [self.top_left, self.top_right, self.bottom_left, self.bottom_right]
    }
}

/// A bank of raw light channels.
///
/// `read` must return the channel's current intensity in `[0, RANGE_MAX]` under normal
/// operation. There is no failure path: a disconnected channel simply reads whatever the
/// ADC floats to.
pub trait LightSensor {
    fn read(&mut self, channel: Quadrant) -> u16;
}

impl<T: LightSensor + ?Sized> LightSensor for &mut T {
    fn read(&mut self, channel: Quadrant) -> u16 {
        (**self).read(channel)
    }
}

/// Reads all four channels back to back so they belong to the same instant.
pub struct Sampler<S> {
    sensors: S,
}

impl<S: LightSensor> Sampler<S> {
    pub fn sample(&mut self) -> SensorReading {
        let reading = SensorReading {
            top_left: self.sensors.read(Quadrant::TopLeft),
            top_right: self.sensors.read(Quadrant::TopRight),
            bottom_left: self.sensors.read(Quadrant::BottomLeft),
            bottom_right: self.sensors.read(Quadrant::BottomRight),
        };
        trace!("[Sampler] raw {:?}", reading.as_array());
        reading
    }
}

impl<S> Sampler<S> {
    pub fn new(sensors: S) -> Self {
        Self { sensors }
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }
}
