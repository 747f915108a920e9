#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and discharge-curve parsing for the battery monitor.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section is optional; an empty file yields the stock 3S pack tuning.
//! - The discharge-curve CSV loader enforces headers and the breakpoint
//!   ordering the estimator relies on.
use serde::Deserialize;
use serde::de::Deserializer;
use std::path::{Path, PathBuf};

/// Discharge-curve CSV schema.
///
/// Expected headers:
/// voltage,percent
///
/// Example:
/// voltage,percent
/// 12.60,100
/// 9.00,0
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CurveRow {
    pub voltage: f64,
    pub percent: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pack {
    /// Rated pack capacity; also the starting point for learned capacity.
    pub nominal_capacity_mah: f64,
    /// Optional discharge curve override (CSV, strict header).
    pub curve_csv: Option<PathBuf>,
}

impl Default for Pack {
    fn default() -> Self {
        Self {
            nominal_capacity_mah: 3400.0,
            curve_csv: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChargeCfg {
    /// Current above this many mA counts as charging
    pub current_threshold_ma: f64,
    /// Seconds after a charge-state change before voltage is trusted
    pub settle_s: u64,
}

impl Default for ChargeCfg {
    fn default() -> Self {
        Self {
            current_threshold_ma: 10.0,
            settle_s: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Resting voltage at or above which the pack is considered full
    pub full_voltage: f64,
    /// |current| must be below this (mA) for the full-charge snap
    pub full_current_max_ma: f64,
    /// At or below this voltage the integral snaps to the curve
    pub critical_voltage: f64,
    /// A full-charge snap from below this SOC counts as a completed cycle
    pub learn_below_soc: f64,
    /// Per-sample blend weight toward voltage SOC once settled
    pub drift_weight: f64,
    /// Ceilings applied while charging or unsettled. Accepts either:
    /// - array of tables: [{ below_v = 12.4, max_soc = 90.0 }, ...]
    /// - array of tuples: [[12.4, 90.0], [12.0, 80.0]]
    #[serde(deserialize_with = "de_clamp_bands")]
    pub clamp_bands: Vec<(f64, f64)>,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            full_voltage: 12.5,
            full_current_max_ma: 100.0,
            critical_voltage: 9.6,
            learn_below_soc: 95.0,
            drift_weight: 0.01,
            clamp_bands: vec![(12.4, 90.0), (12.0, 80.0)],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LearningCfg {
    /// Session discharge (mAh) required before a cycle teaches anything
    pub min_session_discharge_mah: f64,
    /// Session must have started above this SOC
    pub min_start_soc: f64,
    pub min_capacity_mah: f64,
    pub max_capacity_mah: f64,
    /// Capacity samples kept for the weighted average
    pub max_samples: usize,
}

impl Default for LearningCfg {
    fn default() -> Self {
        Self {
            min_session_discharge_mah: 500.0,
            min_start_soc: 20.0,
            min_capacity_mah: 1000.0,
            max_capacity_mah: 5000.0,
            max_samples: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WarningsCfg {
    /// Percent thresholds; evaluated highest first
    pub thresholds: Vec<f64>,
    /// Thresholds at or below this are reported as critical
    pub critical_threshold: f64,
    /// Thresholds at or below this (and above critical) ask for the charger
    pub low_threshold: f64,
    /// Minimum seconds between two warnings
    pub debounce_s: u64,
    /// Where warnings are delivered
    pub notifier: NotifierKind,
}

/// Warning delivery backend.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// `notify-send` desktop notifications
    #[default]
    Desktop,
    /// Log only (headless hosts)
    Log,
}

impl Default for WarningsCfg {
    fn default() -> Self {
        Self {
            thresholds: vec![20.0, 10.0, 5.0],
            critical_threshold: 5.0,
            low_threshold: 10.0,
            debounce_s: 60,
            notifier: NotifierKind::Desktop,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeCfg {
    /// Rolling history length for current/power averaging (samples)
    pub history_len: usize,
    /// Samples needed before the history average replaces the instantaneous current
    pub min_history: usize,
    /// Below this average current (mA) no estimate is produced
    pub min_current_ma: f64,
    /// Estimates longer than this many hours are discarded
    pub max_hours: f64,
}

impl Default for RuntimeCfg {
    fn default() -> Self {
        Self {
            history_len: 60,
            min_history: 3,
            min_current_ma: 30.0,
            max_hours: 50.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Persistence {
    /// Data directory; defaults to ~/.local/share/battmon when absent
    pub data_dir: Option<PathBuf>,
    /// Seconds between opportunistic profile saves
    pub save_interval_s: u64,
    /// Append one CSV row per sample under <data_dir>/logs
    pub telemetry: bool,
}

impl Default for Persistence {
    fn default() -> Self {
        Self {
            data_dir: None,
            save_interval_s: 30,
            telemetry: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sensor {
    pub i2c_bus: u8,
    pub address: u16,
    pub shunt_ohms: f64,
    /// Sampler period for `monitor`
    pub sample_period_ms: u64,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            address: 0x41,
            shunt_ohms: 0.1,
            sample_period_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Shutdown {
    pub check_interval_s: u64,
    /// Bus voltage at or below which a check counts as low
    pub voltage: f64,
    /// Hybrid SOC at or below which a check counts as low
    pub percent: f64,
    /// Consecutive low checks before powering off
    pub consecutive_low: u32,
    /// Warn on the first low check
    pub warn_before: bool,
    pub pid_file: PathBuf,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self {
            check_interval_s: 10,
            voltage: 9.6,
            percent: 3.0,
            consecutive_low: 3,
            warn_before: true,
            pid_file: PathBuf::from("/tmp/battmon_shutdown.pid"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pack: Pack,
    pub charge: ChargeCfg,
    pub calibration: CalibrationCfg,
    pub learning: LearningCfg,
    pub warnings: WarningsCfg,
    pub runtime: RuntimeCfg,
    pub persistence: Persistence,
    pub sensor: Sensor,
    pub shutdown: Shutdown,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BandToml {
    Tuple((f64, f64)),
    Table { below_v: f64, max_soc: f64 },
}

fn de_clamp_bands<'de, D>(deserializer: D) -> Result<Vec<(f64, f64)>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<BandToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for b in items {
            match b {
                BandToml::Tuple((v, soc)) => out.push((v, soc)),
                BandToml::Table { below_v, max_soc } => out.push((below_v, max_soc)),
            }
        }
    }
    Ok(out)
}

/// Check breakpoint ordering: at least two rows running from 100 percent down
/// to 0 percent, voltage strictly descending, percent non-increasing.
pub fn check_curve(rows: &[CurveRow]) -> eyre::Result<()> {
    if rows.len() < 2 {
        eyre::bail!("discharge curve requires at least two rows, got {}", rows.len());
    }
    for (i, r) in rows.iter().enumerate() {
        if !r.voltage.is_finite() || !r.percent.is_finite() {
            eyre::bail!("discharge curve row {} is not finite", i);
        }
        if !(0.0..=100.0).contains(&r.percent) {
            eyre::bail!("discharge curve row {} percent must be in [0, 100]", i);
        }
    }
    let (first, last) = (rows[0].percent, rows[rows.len() - 1].percent);
    if first != 100.0 || last != 0.0 {
        eyre::bail!(
            "discharge curve must start at 100 percent and end at 0 percent, got {} .. {}",
            first,
            last
        );
    }
    for i in 1..rows.len() {
        if rows[i].voltage >= rows[i - 1].voltage {
            eyre::bail!(
                "discharge curve voltages must be strictly descending (rows {} and {})",
                i - 1,
                i
            );
        }
        if rows[i].percent > rows[i - 1].percent {
            eyre::bail!(
                "discharge curve percent must not increase as voltage falls (rows {} and {})",
                i - 1,
                i
            );
        }
    }
    Ok(())
}

pub fn load_curve_csv(path: &Path) -> eyre::Result<Vec<CurveRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open curve CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["voltage", "percent"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "curve CSV must have headers 'voltage,percent', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CurveRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    check_curve(&rows)?;
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pack
        if !self.pack.nominal_capacity_mah.is_finite() || self.pack.nominal_capacity_mah <= 0.0 {
            eyre::bail!("pack.nominal_capacity_mah must be > 0");
        }

        // Charge
        if self.charge.current_threshold_ma.is_sign_negative() {
            eyre::bail!("charge.current_threshold_ma must be >= 0");
        }
        if self.charge.settle_s > 60 * 60 {
            eyre::bail!("charge.settle_s is unreasonably large (>1h)");
        }

        // Calibration
        let cal = &self.calibration;
        if !(cal.critical_voltage < cal.full_voltage) {
            eyre::bail!("calibration.critical_voltage must be below calibration.full_voltage");
        }
        if !(cal.full_current_max_ma > 0.0) {
            eyre::bail!("calibration.full_current_max_ma must be > 0");
        }
        if !(0.0..=100.0).contains(&cal.learn_below_soc) {
            eyre::bail!("calibration.learn_below_soc must be in [0, 100]");
        }
        if !(0.0..=1.0).contains(&cal.drift_weight) {
            eyre::bail!("calibration.drift_weight must be in [0.0, 1.0]");
        }
        for (v, soc) in &cal.clamp_bands {
            if !(0.0..=100.0).contains(soc) || !v.is_finite() {
                eyre::bail!("calibration.clamp_bands entries must be (voltage, 0..=100)");
            }
        }

        // Learning
        let l = &self.learning;
        if !(l.min_capacity_mah > 0.0 && l.min_capacity_mah < l.max_capacity_mah) {
            eyre::bail!("learning capacity range must satisfy 0 < min_capacity_mah < max_capacity_mah");
        }
        if l.max_samples == 0 {
            eyre::bail!("learning.max_samples must be >= 1");
        }
        if !(0.0..100.0).contains(&l.min_start_soc) {
            eyre::bail!("learning.min_start_soc must be in [0, 100)");
        }

        // Warnings
        if self.warnings.critical_threshold > self.warnings.low_threshold {
            eyre::bail!("warnings.critical_threshold must be <= warnings.low_threshold");
        }
        if self
            .warnings
            .thresholds
            .iter()
            .any(|t| !(0.0..=100.0).contains(t))
        {
            eyre::bail!("warnings.thresholds must be in [0, 100]");
        }

        // Runtime
        if self.runtime.history_len == 0 {
            eyre::bail!("runtime.history_len must be >= 1");
        }
        if !(self.runtime.max_hours > 0.0) {
            eyre::bail!("runtime.max_hours must be > 0");
        }

        // Persistence
        if self.persistence.save_interval_s == 0 {
            eyre::bail!("persistence.save_interval_s must be >= 1");
        }

        // Sensor
        if !(self.sensor.shunt_ohms > 0.0) {
            eyre::bail!("sensor.shunt_ohms must be > 0");
        }
        if self.sensor.sample_period_ms == 0 {
            eyre::bail!("sensor.sample_period_ms must be >= 1");
        }

        // Shutdown
        if self.shutdown.consecutive_low == 0 {
            eyre::bail!("shutdown.consecutive_low must be >= 1");
        }
        if self.shutdown.check_interval_s == 0 {
            eyre::bail!("shutdown.check_interval_s must be >= 1");
        }

        Ok(())
    }
}
