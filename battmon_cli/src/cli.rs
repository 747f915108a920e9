//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "battmon", version, about = "Battery monitor for a 3S Li-ion pack")]
pub struct Cli {
    /// Path to config TOML (defaults to the user config dir, then built-in tuning)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for learned_data.json and logs/ (overrides persistence.data_dir)
    #[arg(long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Use the simulated sensor even when built with hardware support
    #[arg(long, action = ArgAction::SetTrue)]
    pub sim: bool,

    /// JSON output: logs as JSON lines, results and errors as JSON objects
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); logs go to stderr
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Take one reading and print a conky-style status line
    Status,
    /// Sample continuously, publishing status and warnings
    Monitor {
        /// Write a JSON status snapshot here after every sample
        #[arg(long = "status-file", value_name = "FILE")]
        status_file: Option<PathBuf>,
        /// Stop after this many samples
        #[arg(long, value_name = "N")]
        samples: Option<u64>,
        /// Override sensor.sample_period_ms
        #[arg(long = "period-ms", value_name = "MS")]
        period_ms: Option<u64>,
    },
    /// Power the host off safely when the pack stays critically low
    Watchdog {
        /// Override shutdown.check_interval_s
        #[arg(long = "interval-s", value_name = "SECS")]
        interval_s: Option<u64>,
        /// Log the shutdown instead of running it
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
        /// Stop after this many checks
        #[arg(long = "max-checks", value_name = "N")]
        max_checks: Option<u64>,
        /// Override shutdown.pid_file
        #[arg(long = "pid-file", value_name = "FILE")]
        pid_file: Option<PathBuf>,
    },
    /// Print learned capacity and usage statistics
    Stats,
    /// Quick health check (sensor reachable, config valid)
    SelfCheck,
}
