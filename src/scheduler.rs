//! scheduler.rs
//! Cycle driver: invokes [`Tracker::cycle`] at a fixed period.
//! - Real-time pacing: SpinSleeper holds the release period (default 20 ms)
//! - Deadline tracking: a release that starts late is counted, logged and re-synchronised;
//!   the tracker itself never sees it
//! - Optional dedicated thread with max priority and core pinning

use log::{debug, info, warn};
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use thread_priority::{ThreadBuilderExt, ThreadPriority};

use crate::actuation::driver::ActuatorDriver;
use crate::sensing::sensor::LightSensor;
use crate::tracker::{CycleReport, Tracker};
use crate::utils::metrics::{lock_metrics, Event, EventRecorder, SharedMetrics};

pub struct CycleDriver {
    period: Duration,
    max_cycles: u64,
    time_budget: Option<Duration>,
    running: Arc<AtomicBool>,
    metrics: SharedMetrics,
    event_recorder: Arc<EventRecorder>,
}

impl CycleDriver {
    /// `max_cycles == 0` runs until `running` is cleared.
    pub fn new(
        period: Duration,
        max_cycles: u64,
        running: Arc<AtomicBool>,
        metrics: SharedMetrics,
        event_recorder: Arc<EventRecorder>,
    ) -> Self {
        Self { period, max_cycles, time_budget: None, running, metrics, event_recorder }
    }

    /// Also stops once `budget` of wall-clock time has passed since the loop started.
    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }

    /// Main loop: periodic release, one tracker cycle per release.
    ///
    /// `after_cycle` runs after each cycle outside the timed section, e.g. to advance a
    /// simulated sun. Returns the number of cycles executed.
    pub fn run<S, D, F>(&self, tracker: &mut Tracker<S, D>, mut after_cycle: F) -> u64
    where
        S: LightSensor,
        D: ActuatorDriver,
        F: FnMut(&CycleReport),
    {
        let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);
        let period_us = self.period.as_micros() as u64;

        let started = Instant::now();
        let mut next_release = started + self.period;
        let mut last_release = Instant::now();
        let mut executed: u64 = 0;

        info!(
            "[CycleDriver] started period={:?} cycles={}",
            self.period,
            if self.max_cycles == 0 { "unbounded".to_string() } else { self.max_cycles.to_string() }
        );

        while self.running.load(Ordering::Acquire) {
            if self.max_cycles != 0 && executed >= self.max_cycles {
                break;
            }
            if let Some(budget) = self.time_budget {
                if started.elapsed() >= budget {
                    info!("[CycleDriver] time budget {:?} used up", budget);
                    break;
                }
            }

            let now = Instant::now();
            if now < next_release {
                sleeper.sleep(next_release - now);
            } else if executed > 0 {
                let late_us = now.duration_since(next_release).as_micros() as u64;
                if late_us > 0 {
                    warn!("[CycleDriver] release #{} late by {} us", executed + 1, late_us);
                    lock_metrics(&self.metrics).record_deadline_miss();
                    self.event_recorder.record(Event::Overrun {
                        seq: executed + 1,
                        ts_ns: self.event_recorder.now_ns(),
                        late_us,
                    });
                    // resync instead of bursting to catch up
                    next_release = now;
                }
            }

            let release = Instant::now();
            let jitter_us = (release.duration_since(last_release).as_micros() as u64).abs_diff(period_us);
            last_release = release;

            let report = tracker.cycle();
            let exec_us = release.elapsed().as_micros() as u64;

            self.event_recorder.record(Event::Sampled {
                seq: report.seq,
                ts_ns: self.event_recorder.now_ns(),
                raw: report.raw.as_array(),
            });
            self.event_recorder.record(Event::Commanded {
                seq: report.seq,
                ts_ns: self.event_recorder.now_ns(),
                err_vertical: report.error.vertical,
                err_horizontal: report.error.horizontal,
                pan: report.position.pan,
                tilt: report.position.tilt,
            });

            {
                let mut m = lock_metrics(&self.metrics);
                m.record_cycle(&report, tracker.at_stop());
                if executed > 0 {
                    m.record_timing(exec_us, jitter_us);
                }
            }

            after_cycle(&report);

            executed += 1;
            next_release += self.period;
        }

        debug!("[CycleDriver] stopped after {} cycles", executed);
        executed
    }
}

/// Spawns `f` on a named thread at max priority, optionally pinned to `pin_core`.
///
/// Failing to raise priority or pin is logged and otherwise ignored.
pub fn spawn_tracking_thread<T, F>(
    name: &str,
    pin_core: Option<usize>,
    f: F,
) -> io::Result<thread::JoinHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let label = name.to_string();
    thread::Builder::new()
        .name(name.to_string())
        .spawn_with_priority(ThreadPriority::Max, move |priority| {
            if let Err(e) = priority {
                warn!("[{}] could not raise thread priority: {:?}", label, e);
            }
            if let Some(core) = pin_core {
                let core_ids = core_affinity::get_core_ids().unwrap_or_default();
                match core_ids.get(core) {
                    Some(id) if core_affinity::set_for_current(*id) => {
                        info!("[{}] pinned to core {}", label, core);
                    }
                    Some(_) => warn!("[{}] failed to pin to core {}", label, core),
                    None => warn!("[{}] core {} not available", label, core),
                }
            }
            f()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::driver::RecordingDriver;
    use crate::config::ControlParameters;
    use crate::sensing::sensor::{Quadrant, SensorReading};
    use crate::utils::metrics::Metrics;
    use std::sync::Mutex;

    struct Constant(SensorReading);

    impl LightSensor for Constant {
        fn read(&mut self, channel: Quadrant) -> u16 {
            self.0.get(channel)
        }
    }

    fn driver(max_cycles: u64) -> (CycleDriver, SharedMetrics, Arc<AtomicBool>) {
        let metrics: SharedMetrics = Arc::new(Mutex::new(Metrics::default()));
        let running = Arc::new(AtomicBool::new(true));
        let d = CycleDriver::new(
            Duration::from_millis(1),
            max_cycles,
            running.clone(),
            metrics.clone(),
            Arc::new(EventRecorder::new()),
        );
        (d, metrics, running)
    }

    #[test]
    fn runs_the_configured_number_of_cycles() {
        let (d, metrics, _running) = driver(25);
        let mut tracker = Tracker::start(
            ControlParameters::default(),
            Constant(SensorReading::uniform(500)),
            RecordingDriver::new(),
        )
        .unwrap();

        let mut seen = 0;
        let executed = d.run(&mut tracker, |_| seen += 1);
        assert_eq!(executed, 25);
        assert_eq!(seen, 25);
        assert_eq!(tracker.cycles(), 25);
        assert_eq!(lock_metrics(&metrics).total_cycles, 25);
    }

    #[test]
    fn stops_when_running_flag_is_cleared() {
        let (d, _metrics, running) = driver(0);
        let mut tracker = Tracker::start(
            ControlParameters::default(),
            Constant(SensorReading::uniform(500)),
            RecordingDriver::new(),
        )
        .unwrap();

        let executed = d.run(&mut tracker, |report| {
            if report.seq == 10 {
                running.store(false, Ordering::Release);
            }
        });
        assert_eq!(executed, 10);
    }

    #[test]
    fn time_budget_ends_an_unbounded_run() {
        let (d, metrics, _running) = driver(0);
        let d = d.with_time_budget(Some(Duration::from_millis(30)));
        let mut tracker = Tracker::start(
            ControlParameters::default(),
            Constant(SensorReading::uniform(500)),
            RecordingDriver::new(),
        )
        .unwrap();

        let executed = d.run(&mut tracker, |_| {});
        assert!(executed > 0);
        assert_eq!(lock_metrics(&metrics).total_cycles, executed);
    }

    #[test]
    fn late_releases_are_counted_traced_and_resynced() {
        let metrics: SharedMetrics = Arc::new(Mutex::new(Metrics::default()));
        let recorder = Arc::new(EventRecorder::new());
        let d = CycleDriver::new(
            Duration::from_millis(2),
            6,
            Arc::new(AtomicBool::new(true)),
            metrics.clone(),
            recorder.clone(),
        );
        let mut tracker = Tracker::start(
            ControlParameters::default(),
            Constant(SensorReading::uniform(500)),
            RecordingDriver::new(),
        )
        .unwrap();

        // every cycle overruns the 2 ms period
        let executed = d.run(&mut tracker, |_| thread::sleep(Duration::from_millis(5)));
        assert_eq!(executed, 6);
        assert_eq!(lock_metrics(&metrics).deadline_miss, executed - 1);

        let path = std::env::temp_dir().join(format!("solar_tracker_overrun_{}.csv", std::process::id()));
        let exporter = recorder.start_exporter(path.to_string_lossy().into_owned(), "overrun".into());
        recorder.finish();
        exporter.join().unwrap();
        assert!(recorder.is_empty());

        let content = std::fs::read_to_string(&path).unwrap();
        let overruns = content.lines().filter(|l| l.contains(",Overrun,")).count();
        assert_eq!(overruns as u64, executed - 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn tracking_thread_returns_its_result() {
        let handle = spawn_tracking_thread("test-tracker", None, || 42).unwrap();
        assert_eq!(handle.join().unwrap(), 42);
    }
}
