//! Per-sample CSV telemetry.
//!
//! One file per day under `<data_dir>/logs/`, appended across restarts.
//! Every row is flushed so a crash loses at most the sample in flight.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::error::EstimatorError;

pub const HEADER: [&str; 9] = [
    "timestamp",
    "voltage",
    "current_ma",
    "power_mw",
    "voltage_soc",
    "coulomb_soc",
    "hybrid_soc",
    "charging",
    "capacity_mah",
];

/// One estimator step, as logged.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRow {
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub voltage: f64,
    pub current_ma: f64,
    pub power_mw: f64,
    pub voltage_soc: f64,
    pub coulomb_soc: Option<f64>,
    pub hybrid_soc: f64,
    pub charging: bool,
    pub capacity_mah: f64,
}

impl TelemetryRow {
    pub fn fields(&self) -> [String; 9] {
        [
            self.timestamp.clone(),
            format!("{:.3}", self.voltage),
            format!("{:.1}", self.current_ma),
            format!("{:.1}", self.power_mw),
            format!("{:.1}", self.voltage_soc),
            self.coulomb_soc.map(|c| format!("{c:.1}")).unwrap_or_default(),
            format!("{:.1}", self.hybrid_soc),
            if self.charging { "1" } else { "0" }.to_string(),
            format!("{:.0}", self.capacity_mah),
        ]
    }
}

pub trait TelemetrySink {
    fn record(&mut self, row: &TelemetryRow) -> Result<(), EstimatorError>;
    fn flush(&mut self) -> Result<(), EstimatorError>;
}

/// `battery_YYYY-MM-DD.csv`
pub fn log_file_name(date: NaiveDate) -> String {
    format!("battery_{}.csv", date.format("%Y-%m-%d"))
}

pub struct CsvTelemetry {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvTelemetry {
    /// Open (append) the day's file in `log_dir`, creating it with a header.
    pub fn open_dated(log_dir: &Path, date: NaiveDate) -> Result<Self, EstimatorError> {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            EstimatorError::Telemetry(format!("create {}: {e}", log_dir.display()))
        })?;
        Self::open(log_dir.join(log_file_name(date)))
    }

    /// `open_dated` with today's local date.
    pub fn open_today(log_dir: &Path) -> Result<Self, EstimatorError> {
        Self::open_dated(log_dir, chrono::Local::now().date_naive())
    }

    pub fn open(path: PathBuf) -> Result<Self, EstimatorError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EstimatorError::Telemetry(format!("open {}: {e}", path.display())))?;
        let fresh = file.metadata().map(|m| m.len() == 0).unwrap_or(true);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if fresh {
            writer.write_record(HEADER).map_err(csv_err)?;
            writer.flush()?;
        }
        tracing::debug!(path = %path.display(), fresh, "telemetry log open");
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn csv_err(e: csv::Error) -> EstimatorError {
    EstimatorError::Telemetry(e.to_string())
}

impl TelemetrySink for CsvTelemetry {
    fn record(&mut self, row: &TelemetryRow) -> Result<(), EstimatorError> {
        self.writer.write_record(row.fields()).map_err(csv_err)?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EstimatorError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn record(&mut self, _row: &TelemetryRow) -> Result<(), EstimatorError> {
        Ok(())
    }
    fn flush(&mut self) -> Result<(), EstimatorError> {
        Ok(())
    }
}

/// Keeps rows in memory; clones share the buffer so tests can inspect
/// what an estimator wrote.
#[derive(Debug, Default, Clone)]
pub struct MemoryTelemetry {
    rows: Arc<Mutex<Vec<TelemetryRow>>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<TelemetryRow> {
        match self.rows.lock() {
            Ok(g) => g.clone(),
            Err(p) => p.into_inner().clone(),
        }
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn record(&mut self, row: &TelemetryRow) -> Result<(), EstimatorError> {
        match self.rows.lock() {
            Ok(mut g) => g.push(row.clone()),
            Err(p) => p.into_inner().push(row.clone()),
        }
        Ok(())
    }
    fn flush(&mut self) -> Result<(), EstimatorError> {
        Ok(())
    }
}
