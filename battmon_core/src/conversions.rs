//! `From` implementations bridging `battmon_config` types to core runtime types.

use std::time::Duration;

use crate::config::{
    CalibrationCfg, ChargeCfg, EstimatorCfg, LearningCfg, PersistenceCfg, RuntimeCfg,
    ShutdownCfg, WarningCfg,
};
use crate::curve::VoltageCurve;
use crate::error::BuildError;

// ── Charge ───────────────────────────────────────────────────────────────────

impl From<&battmon_config::ChargeCfg> for ChargeCfg {
    fn from(c: &battmon_config::ChargeCfg) -> Self {
        Self {
            current_threshold_ma: c.current_threshold_ma,
            settle: Duration::from_secs(c.settle_s),
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&battmon_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &battmon_config::CalibrationCfg) -> Self {
        Self {
            full_voltage: c.full_voltage,
            full_current_max_ma: c.full_current_max_ma,
            critical_voltage: c.critical_voltage,
            learn_below_soc: c.learn_below_soc,
            drift_weight: c.drift_weight,
            clamp_bands: c.clamp_bands.clone(),
        }
    }
}

// ── Learning ─────────────────────────────────────────────────────────────────

impl From<&battmon_config::LearningCfg> for LearningCfg {
    fn from(c: &battmon_config::LearningCfg) -> Self {
        Self {
            min_session_discharge_mah: c.min_session_discharge_mah,
            min_start_soc: c.min_start_soc,
            min_capacity_mah: c.min_capacity_mah,
            max_capacity_mah: c.max_capacity_mah,
            max_samples: c.max_samples,
        }
    }
}

// ── Warnings ─────────────────────────────────────────────────────────────────

impl From<&battmon_config::WarningsCfg> for WarningCfg {
    fn from(c: &battmon_config::WarningsCfg) -> Self {
        Self {
            thresholds: c.thresholds.clone(),
            critical_threshold: c.critical_threshold,
            low_threshold: c.low_threshold,
            debounce: Duration::from_secs(c.debounce_s),
        }
    }
}

// ── Runtime ──────────────────────────────────────────────────────────────────

impl From<&battmon_config::RuntimeCfg> for RuntimeCfg {
    fn from(c: &battmon_config::RuntimeCfg) -> Self {
        Self {
            history_len: c.history_len,
            min_history: c.min_history,
            min_current_ma: c.min_current_ma,
            max_hours: c.max_hours,
        }
    }
}

impl From<&battmon_config::Persistence> for PersistenceCfg {
    fn from(c: &battmon_config::Persistence) -> Self {
        Self {
            save_interval: Duration::from_secs(c.save_interval_s),
        }
    }
}

impl From<&battmon_config::Shutdown> for ShutdownCfg {
    fn from(c: &battmon_config::Shutdown) -> Self {
        Self {
            voltage: c.voltage,
            percent: c.percent,
            consecutive_low: c.consecutive_low,
            warn_before: c.warn_before,
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&battmon_config::Config> for EstimatorCfg {
    fn from(c: &battmon_config::Config) -> Self {
        Self {
            nominal_capacity_mah: c.pack.nominal_capacity_mah,
            charge: (&c.charge).into(),
            calibration: (&c.calibration).into(),
            learning: (&c.learning).into(),
            warnings: (&c.warnings).into(),
            runtime: (&c.runtime).into(),
            persistence: (&c.persistence).into(),
        }
    }
}

// ── Curve ────────────────────────────────────────────────────────────────────

impl TryFrom<&[battmon_config::CurveRow]> for VoltageCurve {
    type Error = BuildError;

    fn try_from(rows: &[battmon_config::CurveRow]) -> Result<Self, Self::Error> {
        VoltageCurve::new(rows.iter().map(|r| (r.voltage, r.percent)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_maps_to_default_runtime_cfg() {
        let cfg = EstimatorCfg::from(&battmon_config::Config::default());
        let def = EstimatorCfg::default();
        assert_eq!(cfg.nominal_capacity_mah, def.nominal_capacity_mah);
        assert_eq!(cfg.charge.settle, def.charge.settle);
        assert_eq!(cfg.calibration.clamp_bands, def.calibration.clamp_bands);
        assert_eq!(cfg.warnings.debounce, def.warnings.debounce);
        assert_eq!(cfg.persistence.save_interval, def.persistence.save_interval);
    }

    #[test]
    fn curve_rows_convert() {
        let rows = [
            battmon_config::CurveRow {
                voltage: 4.2,
                percent: 100.0,
            },
            battmon_config::CurveRow {
                voltage: 3.0,
                percent: 0.0,
            },
        ];
        let curve = VoltageCurve::try_from(&rows[..]).unwrap();
        assert!((curve.voltage_to_percent(3.6) - 50.0).abs() < 1e-9);
    }
}
