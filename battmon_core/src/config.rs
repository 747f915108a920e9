//! Configuration types for the estimator.
//!
//! These are the runtime configuration structs used by `Estimator`.
//! They are separate from the TOML-deserialized config in `battmon_config`.

use std::time::Duration;

/// Charge-state detection.
#[derive(Debug, Clone)]
pub struct ChargeCfg {
    /// Current above this (mA) means the charger is connected.
    pub current_threshold_ma: f64,
    /// Time after a charge-state change before terminal voltage is trusted.
    pub settle: Duration,
}

impl Default for ChargeCfg {
    fn default() -> Self {
        Self {
            current_threshold_ma: 10.0,
            settle: Duration::from_secs(30),
        }
    }
}

/// Voltage calibration points and drift correction.
#[derive(Debug, Clone)]
pub struct CalibrationCfg {
    /// Resting voltage at or above which the pack is full.
    pub full_voltage: f64,
    /// |current| must be below this (mA) for the full-charge snap.
    pub full_current_max_ma: f64,
    /// At or below this voltage the integral snaps to the curve.
    pub critical_voltage: f64,
    /// A full-charge snap from below this SOC completes a learning cycle.
    pub learn_below_soc: f64,
    /// Per-sample blend weight toward voltage SOC once settled.
    pub drift_weight: f64,
    /// `(below_v, max_soc)`: while charging or unsettled, a voltage under
    /// `below_v` caps the integral at `max_soc`. Every matching band applies.
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

/// Capacity learning gates.
#[derive(Debug, Clone)]
pub struct LearningCfg {
    pub min_session_discharge_mah: f64,
    pub min_start_soc: f64,
    /// Observed capacities must fall strictly inside (min, max).
    pub min_capacity_mah: f64,
    pub max_capacity_mah: f64,
    /// Ring size for the weighted capacity average.
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

/// Low-battery warning thresholds.
#[derive(Debug, Clone)]
pub struct WarningCfg {
    /// Percent thresholds; sorted descending at build.
    pub thresholds: Vec<f64>,
    pub critical_threshold: f64,
    pub low_threshold: f64,
    /// No new warning within this long of the previous one.
    pub debounce: Duration,
}

impl Default for WarningCfg {
    fn default() -> Self {
        Self {
            thresholds: vec![20.0, 10.0, 5.0],
            critical_threshold: 5.0,
            low_threshold: 10.0,
            debounce: Duration::from_secs(60),
        }
    }
}

/// Smoothing history and time-estimate bounds.
#[derive(Debug, Clone)]
pub struct RuntimeCfg {
    /// Rolling history length (60 samples ≈ 5 min at 5 s cadence).
    pub history_len: usize,
    pub min_history: usize,
    pub min_current_ma: f64,
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

#[derive(Debug, Clone)]
pub struct PersistenceCfg {
    /// Minimum time between opportunistic profile saves.
    pub save_interval: Duration,
}

impl Default for PersistenceCfg {
    fn default() -> Self {
        Self {
            save_interval: Duration::from_secs(30),
        }
    }
}

/// Everything the estimator needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct EstimatorCfg {
    pub nominal_capacity_mah: f64,
    pub charge: ChargeCfg,
    pub calibration: CalibrationCfg,
    pub learning: LearningCfg,
    pub warnings: WarningCfg,
    pub runtime: RuntimeCfg,
    pub persistence: PersistenceCfg,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            nominal_capacity_mah: 3400.0,
            charge: ChargeCfg::default(),
            calibration: CalibrationCfg::default(),
            learning: LearningCfg::default(),
            warnings: WarningCfg::default(),
            runtime: RuntimeCfg::default(),
            persistence: PersistenceCfg::default(),
        }
    }
}

/// Safe-shutdown watchdog thresholds.
#[derive(Debug, Clone)]
pub struct ShutdownCfg {
    pub voltage: f64,
    pub percent: f64,
    pub consecutive_low: u32,
    pub warn_before: bool,
}

impl Default for ShutdownCfg {
    fn default() -> Self {
        Self {
            voltage: 9.6,
            percent: 3.0,
            consecutive_low: 3,
            warn_before: true,
        }
    }
}
