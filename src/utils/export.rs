//! CSV export for tracking runs.
//!
//! - `summary.csv`: one appended row per run (parameters, cycle counts, tracking accuracy).
//!   Header written only when the file is created, so a gain sweep accumulates in one file.
//! - `trajectory_<label>.csv`: per-cycle pan/tilt/error history of one run (last 1000 cycles).

use serde::Serialize;
use std::{
    fs::{create_dir_all, OpenOptions},
    path::{Path, PathBuf},
};
use thiserror::Error;
use log::info;

use crate::config::ControlParameters;
use crate::utils::metrics::{calculate_stats, calculate_stats_u64, lock_metrics, SharedMetrics};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub label: String,
    pub gain: f32,
    pub dead_band: i32,
    pub max_step: i32,
    pub window_size: usize,
    pub total_cycles: u64,
    pub deadline_miss: u64,
    pub deadline_miss_rate: f64,
    pub stop_cycles: u64,
    pub mean_offset_deg: f64,
    pub max_offset_deg: f64,
    pub avg_latency_us: f64,
    pub max_jitter_us: f64,
    pub final_pan: i32,
    pub final_tilt: i32,
}

impl RunSummary {
    /// Builds the summary row from the run's metrics.
    pub fn from_metrics(label: &str, params: &ControlParameters, metrics: &SharedMetrics) -> Self {
        let m = lock_metrics(metrics);

        let offset = calculate_stats(&m.tracking_offset_deg);
        let latency = calculate_stats_u64(&m.latency_us);
        let jitter = calculate_stats_u64(&m.jitter_us);
        let miss_rate = if m.total_cycles > 0 {
            (m.deadline_miss as f64 / m.total_cycles as f64) * 100.0
        } else {
            0.0
        };

        RunSummary {
            label: label.to_string(),
            gain: params.gain,
            dead_band: params.dead_band,
            max_step: params.max_step,
            window_size: params.window_size,
            total_cycles: m.total_cycles,
            deadline_miss: m.deadline_miss,
            deadline_miss_rate: miss_rate,
            stop_cycles: m.stop_cycles,
            mean_offset_deg: offset.as_ref().map_or(0.0, |s| s.mean),
            max_offset_deg: offset.as_ref().map_or(0.0, |s| s.max),
            avg_latency_us: latency.map_or(0.0, |s| s.mean),
            max_jitter_us: jitter.map_or(0.0, |s| s.max),
            final_pan: m.pan.back().map_or(params.pan.home, |&v| v as i32),
            final_tilt: m.tilt.back().map_or(params.tilt.home, |&v| v as i32),
        }
    }
}

#[derive(Debug, Serialize)]
struct TrajectoryRow {
    index: usize,
    pan: f64,
    tilt: f64,
    err_vertical: f64,
    err_horizontal: f64,
}

/// Appends one summary row to `<dir>/summary.csv`.
pub fn export_summary_csv(dir: impl AsRef<Path>, summary: &RunSummary) -> Result<PathBuf, ExportError> {
    let dir = dir.as_ref();
    create_dir_all(dir)?;
    let path = dir.join("summary.csv");
    let file_exists = path.exists();

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let mut wtr = csv::WriterBuilder::new().has_headers(!file_exists).from_writer(file);
    wtr.serialize(summary)?;
    wtr.flush()?;

    info!("Summary for run '{}' appended to {:?}", summary.label, path);
    Ok(path)
}

/// Writes the per-cycle history of one run to `<dir>/trajectory_<label>.csv`.
pub fn export_trajectory_csv(
    dir: impl AsRef<Path>,
    label: &str,
    metrics: &SharedMetrics,
) -> Result<PathBuf, ExportError> {
    let dir = dir.as_ref();
    create_dir_all(dir)?;
    let path = dir.join(format!("trajectory_{}.csv", label));

    let m = lock_metrics(metrics);
    let mut wtr = csv::Writer::from_path(&path)?;
    let rows = m.pan.len().min(m.tilt.len()).min(m.err_vertical.len()).min(m.err_horizontal.len());
    for i in 0..rows {
        wtr.serialize(TrajectoryRow {
            index: i,
            pan: m.pan[i],
            tilt: m.tilt[i],
            err_vertical: m.err_vertical[i],
            err_horizontal: m.err_horizontal[i],
        })?;
    }
    wtr.flush()?;

    info!("Trajectory ({} cycles) exported to {:?}", rows, path);
    Ok(path)
}
