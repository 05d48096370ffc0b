//! Metrics collection and event recording for the tracking loop.
//!
//! Two independent paths:
//! - **EventRecorder:** Lock-free queue (16K capacity) → background CSV export (nanosecond precision).
//! - **Metrics:** Shared mutex buffer for run summaries (bounded to 1000 points per series).
//!
//! Neither path feeds back into the control loop; both only observe it.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    collections::VecDeque,
    fs::File,
    io::{BufWriter, Write},
    thread,
    time::{Instant, Duration},
};
use average::{Estimate, Max, Mean, Min};
use crossbeam_queue::ArrayQueue;
use log::error;

use crate::tracker::CycleReport;

/// Per-cycle trace events.
#[derive(Debug, Clone)]
pub enum Event {
    /// Cycle released by the driver; raw sensor values as sampled.
    Sampled {
        seq: u64,
        ts_ns: u64,
        raw: [u16; 4],
    },
    /// Angles commanded at the end of the cycle.
    Commanded {
        seq: u64,
        ts_ns: u64,
        err_vertical: i32,
        err_horizontal: i32,
        pan: i32,
        tilt: i32,
    },
    /// Release started later than scheduled.
    Overrun {
        seq: u64,
        ts_ns: u64,
        late_us: u64,
    },
}

impl Event {
    /// CSV row: seq,event,ts_ns,field1,field2,field3,field4
    pub fn to_csv_row(&self) -> String {
        match self {
            Event::Sampled { seq, ts_ns, raw } => {
                format!("{},Sampled,{},{},{},{},{}", seq, ts_ns, raw[0], raw[1], raw[2], raw[3])
            }
            Event::Commanded { seq, ts_ns, err_vertical, err_horizontal, pan, tilt } => {
                format!("{},Commanded,{},{},{},{},{}", seq, ts_ns, err_vertical, err_horizontal, pan, tilt)
            }
            Event::Overrun { seq, ts_ns, late_us } => {
                format!("{},Overrun,{},{},,,", seq, ts_ns, late_us)
            }
        }
    }
}

const EVENT_QUEUE_CAPACITY: usize = 16_384;

/// Non-blocking event recorder with background CSV export.
///
/// `record()` pushes onto a bounded lock-free queue and drops the event if it is full.
/// `start_exporter()` drains the queue to a CSV file until `finish()` is called and the
/// queue is empty.
#[derive(Clone)]
pub struct EventRecorder {
    queue: Arc<ArrayQueue<Event>>,
    run_start: Instant,
    finished: Arc<AtomicBool>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(EVENT_QUEUE_CAPACITY)),
            run_start: Instant::now(),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn record(&self, event: Event) {
        let _ = self.queue.push(event);
    }

    /// Nanoseconds since recorder creation.
    #[inline]
    pub fn now_ns(&self) -> u64 {
        self.run_start.elapsed().as_nanos() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Lets the exporter exit once the queue is drained.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Spawns the background thread draining the queue into `output_csv`.
    pub fn start_exporter(&self, output_csv: String, label: String) -> thread::JoinHandle<()> {
        let queue = self.queue.clone();
        let finished = self.finished.clone();

        thread::spawn(move || {
            match File::create(&output_csv) {
                Ok(file) => {
                    let mut writer = BufWriter::new(file);
                    let _ = writeln!(writer, "# run={}", label);
                    let _ = writeln!(writer, "seq,event,ts_ns,field1,field2,field3,field4");

                    loop {
                        match queue.pop() {
                            Some(event) => {
                                let _ = writeln!(writer, "{}", event.to_csv_row());
                            }
                            None => {
                                if finished.load(Ordering::Acquire) && queue.is_empty() {
                                    break;
                                }
                                thread::sleep(Duration::from_millis(10));
                            }
                        }
                    }

                    let _ = writer.flush();
                }
                Err(e) => {
                    error!("Failed to create event CSV {}: {}", output_csv, e);
                }
            }
        })
    }
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Run metrics: angle and error histories, cycle timing, counters.
#[derive(Default, Clone, Debug)]
pub struct Metrics {
    /// Commanded angles (last 1000 cycles)
    pub pan: VecDeque<f64>,
    pub tilt: VecDeque<f64>,

    /// Dead-banded errors (last 1000 cycles)
    pub err_vertical: VecDeque<f64>,
    pub err_horizontal: VecDeque<f64>,

    /// Angular distance between sun and pointing direction, when known
    pub tracking_offset_deg: VecDeque<f64>,

    /// Cycle execution time and release jitter (microseconds)
    pub latency_us: VecDeque<u64>,
    pub jitter_us: VecDeque<u64>,

    pub deadline_miss: u64,
    pub stop_cycles: u64,
    pub total_cycles: u64,
}

impl Metrics {
    /// Folds one cycle's report in.
    pub fn record_cycle(&mut self, report: &CycleReport, at_stop: bool) {
        push_capped(&mut self.pan, report.position.pan as f64);
        push_capped(&mut self.tilt, report.position.tilt as f64);
        push_capped(&mut self.err_vertical, report.error.vertical as f64);
        push_capped(&mut self.err_horizontal, report.error.horizontal as f64);
        if at_stop {
            self.stop_cycles += 1;
        }
        self.total_cycles += 1;
    }

    pub fn record_timing(&mut self, exec_us: u64, jitter_us: u64) {
        push_capped_u64(&mut self.latency_us, exec_us);
        push_capped_u64(&mut self.jitter_us, jitter_us);
    }

    pub fn record_offset(&mut self, offset_deg: f64) {
        push_capped(&mut self.tracking_offset_deg, offset_deg);
    }

    pub fn record_deadline_miss(&mut self) {
        self.deadline_miss += 1;
    }
}

pub type SharedMetrics = Arc<Mutex<Metrics>>;

/// Locks shared metrics, recovering the data if a holder panicked.
pub fn lock_metrics(metrics: &SharedMetrics) -> MutexGuard<'_, Metrics> {
    match metrics.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub const MAX_POINTS: usize = 1_000;

/// Appends value to metrics buffer; removes oldest if at capacity (FIFO).
#[inline]
pub fn push_capped(buf: &mut VecDeque<f64>, val: f64) {
    if buf.len() >= MAX_POINTS {
        buf.pop_front();
    }
    buf.push_back(val);
}

#[inline]
pub fn push_capped_u64(buf: &mut VecDeque<u64>, val: u64) {
    if buf.len() >= MAX_POINTS {
        buf.pop_front();
    }
    buf.push_back(val);
}

/// Statistics summary for a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

pub fn calculate_stats<'a>(data: impl IntoIterator<Item = &'a f64>) -> Option<Stats> {
    let mut min = Min::new();
    let mut max = Max::new();
    let mut mean = Mean::new();
    let mut count = 0usize;
    for &x in data {
        min.add(x);
        max.add(x);
        mean.add(x);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(Stats { min: min.min(), max: max.max(), mean: mean.mean(), count })
}

pub fn calculate_stats_u64(data: &VecDeque<u64>) -> Option<Stats> {
    let as_f64: Vec<f64> = data.iter().map(|&x| x as f64).collect();
    calculate_stats(&as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::{controller::Step, position::ActuatorPosition};
    use crate::sensing::{estimator::DirectionalError, filter::SmoothedReading, sensor::SensorReading};

    fn report(pan: i32, tilt: i32) -> CycleReport {
        CycleReport {
            seq: 1,
            raw: SensorReading::uniform(500),
            smoothed: SmoothedReading::default(),
            error: DirectionalError { vertical: 40, horizontal: -35 },
            step: Step::default(),
            position: ActuatorPosition { pan, tilt },
        }
    }

    #[test]
    fn push_capped_keeps_most_recent() {
        let mut buf = VecDeque::new();
        for i in 0..(MAX_POINTS + 10) {
            push_capped(&mut buf, i as f64);
        }
        assert_eq!(buf.len(), MAX_POINTS);
        assert_eq!(buf.front().copied(), Some(10.0));
    }

    #[test]
    fn stats_over_series() {
        let data: VecDeque<f64> = [1.0, 2.0, 6.0].into_iter().collect();
        let s = calculate_stats(&data).unwrap();
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 6.0);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.count, 3);
        assert!(calculate_stats(&VecDeque::<f64>::new()).is_none());
    }

    #[test]
    fn record_cycle_counts_stops() {
        let mut m = Metrics::default();
        m.record_cycle(&report(90, 90), false);
        m.record_cycle(&report(170, 90), true);
        assert_eq!(m.total_cycles, 2);
        assert_eq!(m.stop_cycles, 1);
        assert_eq!(m.pan.back().copied(), Some(170.0));
        assert_eq!(m.err_horizontal.back().copied(), Some(-35.0));
    }

    #[test]
    fn csv_rows_have_seven_columns() {
        let rows = [
            Event::Sampled { seq: 1, ts_ns: 5, raw: [1, 2, 3, 4] }.to_csv_row(),
            Event::Commanded { seq: 1, ts_ns: 6, err_vertical: 0, err_horizontal: 40, pan: 91, tilt: 90 }.to_csv_row(),
            Event::Overrun { seq: 2, ts_ns: 7, late_us: 120 }.to_csv_row(),
        ];
        for row in rows {
            assert_eq!(row.split(',').count(), 7, "{}", row);
        }
    }

    #[test]
    fn exporter_drains_queue_after_finish() {
        let path = std::env::temp_dir().join(format!("solar_tracker_events_{}.csv", std::process::id()));
        let recorder = EventRecorder::new();
        for seq in 0..3 {
            recorder.record(Event::Overrun { seq, ts_ns: recorder.now_ns(), late_us: 1 });
        }
        let handle = recorder.start_exporter(path.to_string_lossy().into_owned(), "test".into());
        recorder.finish();
        handle.join().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2 + 3);
        let _ = std::fs::remove_file(&path);
    }
}
