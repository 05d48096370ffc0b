// Measures one full control cycle (sample, smooth, estimate, step, clamp, command) against a
// fixed-reading sensor, excluding pacing and I/O. The cycle has to fit well inside the 20 ms period.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use solar_tracker::{
    actuation::driver::{ActuatorDriver, Axis},
    config::ControlParameters,
    sensing::sensor::{LightSensor, Quadrant, SensorReading},
    tracker::Tracker,
};

struct Fixed(SensorReading);

impl LightSensor for Fixed {
    fn read(&mut self, channel: Quadrant) -> u16 {
        self.0.get(channel)
    }
}

struct Discard;

impl ActuatorDriver for Discard {
    fn set_angle(&mut self, axis: Axis, degrees: i32) {
        black_box((axis, degrees));
    }
}

fn tracker_cycle_bench(c: &mut Criterion) {
    let mut tracker = Tracker::start(
        ControlParameters::default(),
        Fixed(SensorReading::new(520, 610, 480, 590)),
        Discard,
    )
    .unwrap();

    c.bench_function("tracker_cycle", |b| {
        b.iter(|| {
            let report = tracker.cycle();
            black_box(report);
            // keep the rig off the end stops
            if tracker.at_stop() {
                tracker.recenter();
            }
        })
    });
}

criterion_group!(benches, tracker_cycle_bench);
criterion_main!(benches);
