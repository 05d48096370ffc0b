//! filter.rs
//! Moving-average smoothing over a short rolling window per sensor.
//!
//! Four ring windows share one write index and one saturation flag, so they always hold
//! the same number of samples. Averages use truncating integer division; until the window
//! wraps for the first time only the samples written so far are averaged.

use crate::sensing::sensor::{Quadrant, SensorReading};

/// Fixed-capacity circular buffer of raw intensities for one sensor.
#[derive(Debug, Clone)]
pub struct RingWindow {
    buf: Vec<u16>,
}

impl RingWindow {
    fn new(capacity: usize) -> Self {
        Self { buf: vec![0; capacity.max(1)] }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Truncating mean of the first `count` slots. `count == 0` is treated as 1.
    fn mean_of(&self, count: usize) -> i32 {
        let n = count.clamp(1, self.buf.len());
        let sum: i64 = self.buf[..n].iter().map(|&v| v as i64).sum();
        (sum / n as i64) as i32
    }
}

/// Smoothing filter: one [`RingWindow`] per quadrant plus shared bookkeeping.
#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    windows: [RingWindow; 4],
    index: usize,
    full: bool,
}

impl SmoothingFilter {
    /// Empty filter with windows of `window_size` samples (at least 1).
    pub fn new(window_size: usize) -> Self {
        Self {
            windows: std::array::from_fn(|_| RingWindow::new(window_size)),
            index: 0,
            full: false,
        }
    }

    pub fn window_size(&self) -> usize {
        self.windows[0].capacity()
    }

    /// Number of samples currently contributing to each average.
    pub fn len(&self) -> usize {
        if self.full { self.window_size() } else { self.index }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Writes `reading` into all four windows and advances the shared index.
    pub fn push(&mut self, reading: SensorReading) {
        for q in Quadrant::ALL {
            self.windows[q.index()].buf[self.index] = reading.get(q);
        }
        self.index += 1;
        if self.index >= self.window_size() {
            self.index = 0;
            self.full = true;
        }
    }

    /// Fills every slot with `reading` and marks the windows saturated.
    pub fn seed(&mut self, reading: SensorReading) {
        for q in Quadrant::ALL {
            self.windows[q.index()].buf.fill(reading.get(q));
        }
        self.index = 0;
        self.full = true;
    }

    pub fn average(&self, quadrant: Quadrant) -> i32 {
        self.windows[quadrant.index()].mean_of(self.len())
    }

    /// Smoothed value of all four sensors.
    pub fn smoothed(&self) -> SmoothedReading {
        SmoothedReading {
            top_left: self.average(Quadrant::TopLeft),
            top_right: self.average(Quadrant::TopRight),
            bottom_left: self.average(Quadrant::BottomLeft),
            bottom_right: self.average(Quadrant::BottomRight),
        }
    }
}

/// Output of the filter for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SmoothedReading {
    pub top_left: i32,
    pub top_right: i32,
    pub bottom_left: i32,
    pub bottom_right: i32,
}
