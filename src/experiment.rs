//! experiment.rs
//! Runs the tracker against the simulated rig and exports the results.
//!
//! One run: build rig + tracker → spawn the tracking thread → cycle driver until the cycle
//! budget is spent or `running` is cleared → drain event log → export summary + trajectory.
//! Outputs under `<data_dir>/logs/`:
//! - `events_<label>.csv`: per-cycle trace (raw samples, commands, overruns)
//! - `summary.csv`: one row per run
//! - `trajectory_<label>.csv`: pan/tilt/error history

use log::{error, info};
use std::{
    fs::create_dir_all,
    io,
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc, Mutex},
    time::Duration,
};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::scheduler::{spawn_tracking_thread, CycleDriver};
use crate::simulation::{RigState, SimulatedRig};
use crate::tracker::Tracker;
use crate::utils::{
    export::{export_summary_csv, export_trajectory_csv, ExportError, RunSummary},
    metrics::{lock_metrics, EventRecorder, Metrics, SharedMetrics},
};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("failed to start tracking thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("tracking thread panicked")]
    Panicked,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub final_rig: RigState,
    pub log_dir: PathBuf,
}

/// Gains tried by [`run_gain_sweep`] when none are given.
pub const DEFAULT_GAIN_SWEEP: &[f32] = &[0.005, 0.01, 0.015, 0.02, 0.03];

pub fn run_experiment(config: &Config, label: &str, running: Arc<AtomicBool>) -> Result<RunOutcome, RunError> {
    config.validate()?;
    info!("[Experiment] Starting '{}'", label);

    let log_dir = PathBuf::from(&config.output.data_dir).join("logs");
    create_dir_all(&log_dir).map_err(ExportError::from)?;

    let metrics: SharedMetrics = Arc::new(Mutex::new(Metrics::default()));
    let event_recorder = Arc::new(EventRecorder::new());
    let params = config.control.clone();
    let rig = SimulatedRig::new(config.simulation.clone(), params.pan.home, params.tilt.home);
    let mut tracker = Tracker::start(params.clone(), rig.sensors(), rig.servos())?;

    let driver = CycleDriver::new(
        Duration::from_millis(config.cycle.period_ms),
        config.cycle.cycles,
        running,
        metrics.clone(),
        event_recorder.clone(),
    )
    .with_time_budget(config.cycle.duration_secs.map(Duration::from_secs));

    let thread_rig = rig.clone();
    let thread_metrics = metrics.clone();
    let handle = spawn_tracking_thread("tracker", config.cycle.pin_core, move || {
        driver.run(&mut tracker, |_| {
            let state = thread_rig.snapshot();
            let (d_pan, d_tilt) = state.offset();
            lock_metrics(&thread_metrics).record_offset((d_pan as f64).hypot(d_tilt as f64));
            thread_rig.advance();
        })
    })
    .map_err(RunError::Spawn)?;

    // events queue up until the exporter starts, so it only runs once nothing can bail out
    let events_csv = log_dir.join(format!("events_{}.csv", label));
    let exporter = event_recorder.start_exporter(events_csv.to_string_lossy().into_owned(), label.to_string());

    let joined = handle.join();
    event_recorder.finish();
    if exporter.join().is_err() {
        error!("[Experiment] event exporter thread panicked");
    }
    let executed = joined.map_err(|_| RunError::Panicked)?;

    let summary = RunSummary::from_metrics(label, &params, &metrics);
    export_summary_csv(&log_dir, &summary)?;
    export_trajectory_csv(&log_dir, label, &metrics)?;

    let final_rig = rig.snapshot();
    info!(
        "[Experiment] Completed '{}': {} cycles, final pan={} tilt={}, mean offset {:.2} deg",
        label, executed, final_rig.pan, final_rig.tilt, summary.mean_offset_deg
    );

    Ok(RunOutcome { summary, final_rig, log_dir })
}

/// One run per gain, everything else from `config`. Summaries accumulate in one file.
pub fn run_gain_sweep(config: &Config, gains: &[f32], running: Arc<AtomicBool>) -> Result<Vec<RunSummary>, RunError> {
    let mut summaries = Vec::with_capacity(gains.len());
    for &gain in gains {
        let mut run_config = config.clone();
        run_config.control.gain = gain;
        let label = format!("gain_{:.3}", gain);
        info!("[Sweep] Running {}", label);
        let outcome = run_experiment(&run_config, &label, running.clone())?;
        summaries.push(outcome.summary);
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config(name: &str) -> Config {
        let mut config = Config::default();
        config.cycle.period_ms = 1;
        config.cycle.cycles = 150;
        config.simulation.noise = 0;
        config.simulation.spike_probability = 0.0;
        config.simulation.azimuth_drift_deg = 0.0;
        config.simulation.elevation_drift_deg = 0.0;
        config.output.data_dir = std::env::temp_dir()
            .join(format!("solar_tracker_{}_{}", name, std::process::id()))
            .to_string_lossy()
            .into_owned();
        config
    }

    #[test]
    fn run_moves_toward_the_sun_and_exports() {
        let config = quick_config("experiment");
        let outcome = run_experiment(&config, "quick", Arc::new(AtomicBool::new(true))).unwrap();

        assert_eq!(outcome.summary.total_cycles, 150);
        // sun starts at (130, 55), tracker at (90, 90)
        assert!(outcome.final_rig.pan > 110, "pan {}", outcome.final_rig.pan);
        assert!(outcome.final_rig.tilt < 75, "tilt {}", outcome.final_rig.tilt);
        assert!(outcome.log_dir.join("summary.csv").exists());
        assert!(outcome.log_dir.join("trajectory_quick.csv").exists());
        assert!(outcome.log_dir.join("events_quick.csv").exists());

        let _ = std::fs::remove_dir_all(&config.output.data_dir);
    }

    #[test]
    fn sweep_produces_one_summary_per_gain() {
        let mut config = quick_config("sweep");
        config.cycle.cycles = 20;
        let summaries = run_gain_sweep(&config, &[0.01, 0.02], Arc::new(AtomicBool::new(true))).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].gain, 0.02);
        let _ = std::fs::remove_dir_all(&config.output.data_dir);
    }

    #[test]
    fn unbounded_run_stops_on_its_time_budget_and_exports() {
        let mut config = quick_config("budget");
        config.cycle.cycles = 0;
        config.cycle.duration_secs = Some(1);
        let outcome = run_experiment(&config, "budget", Arc::new(AtomicBool::new(true))).unwrap();

        assert!(outcome.summary.total_cycles > 0);
        assert!(outcome.log_dir.join("trajectory_budget.csv").exists());
        let _ = std::fs::remove_dir_all(&config.output.data_dir);
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let mut config = quick_config("invalid");
        config.control.max_step = -1;
        let err = run_experiment(&config, "bad", Arc::new(AtomicBool::new(true))).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
    }
}
