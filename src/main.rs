//! # Solar Tracker Entry Point
//!
//! Runs the closed-loop tracker against the simulated rig.
//!
//! ## Modes
//! - **Single Run:** one run with the configured gain and cycle budget.
//! - **Gain Sweep:** one run per gain in [0.005, 0.01, 0.015, 0.02, 0.03], summaries in one file.
//!
//! ## Configuration
//! - First argument: path to a TOML file (default `tracker.toml`); missing file falls back
//!   to the built-in defaults.
//!
//! ## Outputs
//! - `<data_dir>/logs/events_<label>.csv`: per-cycle trace (nanosecond precision).
//! - `<data_dir>/logs/summary.csv`: one row per run.
//! - `<data_dir>/logs/trajectory_<label>.csv`: pan/tilt/error history.

use std::{
    env,
    io::{stdin, stdout, Write},
    sync::{atomic::AtomicBool, Arc},
};

use anyhow::{Context, Result};
use log::{error, info};

use solar_tracker::{
    config::Config,
    experiment::{run_experiment, run_gain_sweep, DEFAULT_GAIN_SWEEP},
};

const DEFAULT_CONFIG_PATH: &str = "tracker.toml";

fn main() -> Result<()> {
    env_logger::init();

    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path).with_context(|| format!("loading {}", config_path))?;
    info!("=== SOLAR TRACKER START ({}) ===", config_path);

    loop {
        let choice = prompt_menu();
        match choice.as_str() {
            "1" | "" => {
                let label = format!("gain_{:.3}", config.control.gain);
                match run_experiment(&config, &label, Arc::new(AtomicBool::new(true))) {
                    Ok(outcome) => {
                        let s = &outcome.summary;
                        println!(
                            "\n {} cycles, final pan={} tilt={}, mean offset {:.2} deg, {} deadline misses",
                            s.total_cycles, s.final_pan, s.final_tilt, s.mean_offset_deg, s.deadline_miss
                        );
                        println!(" Results in {}\n", outcome.log_dir.display());
                    }
                    Err(e) => error!("[Main] run failed: {}", e),
                }
            }
            "2" => {
                println!("Running gain sweep over {:?}", DEFAULT_GAIN_SWEEP);
                match run_gain_sweep(&config, DEFAULT_GAIN_SWEEP, Arc::new(AtomicBool::new(true))) {
                    Ok(summaries) => {
                        println!("\n gain     mean_off  max_off  stops");
                        for s in &summaries {
                            println!(
                                " {:<8.3} {:<9.2} {:<8.2} {}",
                                s.gain, s.mean_offset_deg, s.max_offset_deg, s.stop_cycles
                            );
                        }
                        println!();
                    }
                    Err(e) => error!("[Main] sweep failed: {}", e),
                }
            }
            "3" => {
                println!("Exiting. Goodbye!");
                info!("=== SOLAR TRACKER FINISHED ===");
                return Ok(());
            }
            other => {
                println!("Unrecognized option '{}', please try again.", other);
            }
        }
    }
}

fn prompt_menu() -> String {
    println!("\n┌─────────────────────────────────────────────┐");
    println!("│     SELECT TRACKING MODE                    │");
    println!("├─────────────────────────────────────────────┤");
    println!("│  1) Single run (configured gain)            │");
    println!("│  2) Gain sweep                              │");
    println!("│  3) Exit                                    │");
    println!("└─────────────────────────────────────────────┘");
    print!("Select [1/2/3] (default: 1): ");
    let _ = stdout().flush();

    let mut input = String::new();
    // EOF on stdin exits instead of looping on the default
    match stdin().read_line(&mut input) {
        Ok(0) | Err(_) => "3".to_string(),
        Ok(_) => input.trim().to_string(),
    }
}
