//! Read-only views of estimator state for the CLI and external readers.

use serde::Serialize;
use std::path::Path;

use crate::atomic::write_atomic;
use crate::error::EstimatorError;
use crate::runtime::TimeEstimate;

/// Learned statistics (`battmon stats`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub effective_capacity_mah: f64,
    pub cycle_count: u64,
    pub avg_power_mw: f64,
    pub nominal_capacity_mah: f64,
    pub voltage_soc: Option<f64>,
    pub coulomb_soc: Option<f64>,
}

/// Everything a status bar or tray needs, taken under one lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub percent: f64,
    pub voltage: Option<f64>,
    pub current_ma: Option<f64>,
    pub charging: bool,
    pub settled: bool,
    pub time_remaining: Option<TimeEstimate>,
    pub time_to_full: Option<TimeEstimate>,
    /// Same text as `Estimator::format_time_remaining`.
    pub time_text: String,
    pub stats: Stats,
}

impl StatusSnapshot {
    /// Replace `path` with this snapshot as JSON. Readers never see a
    /// partially written file.
    pub fn publish(&self, path: &Path) -> Result<(), EstimatorError> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| EstimatorError::Persistence(format!("serialize status: {e}")))?;
        write_atomic(path, &json)
            .map_err(|e| EstimatorError::Persistence(format!("write {}: {e}", path.display())))
    }

    /// Conky lines: `> NN%[ CHG]`, then the time text in the secondary
    /// colour when there is one.
    pub fn conky_lines(&self) -> Vec<String> {
        let mut out = vec![format!(
            "> {:.0}%{}",
            self.percent,
            if self.charging { " CHG" } else { "" }
        )];
        if !self.time_text.is_empty() {
            out.push(format!("${{color4}}  {}", self.time_text));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(charging: bool, time_text: &str) -> StatusSnapshot {
        StatusSnapshot {
            timestamp: "2026-10-16T00:00:00Z".into(),
            percent: 49.6,
            voltage: Some(11.5),
            current_ma: Some(-850.0),
            charging,
            settled: true,
            time_remaining: Some(TimeEstimate { hours: 2, minutes: 0 }),
            time_to_full: None,
            time_text: time_text.into(),
            stats: Stats {
                effective_capacity_mah: 3400.0,
                cycle_count: 0,
                avg_power_mw: 9000.0,
                nominal_capacity_mah: 3400.0,
                voltage_soc: Some(50.0),
                coulomb_soc: Some(49.6),
            },
        }
    }

    #[test]
    fn conky_format() {
        assert_eq!(
            snapshot(false, "2h 0m remaining").conky_lines(),
            vec!["> 50%", "${color4}  2h 0m remaining"]
        );
        assert_eq!(snapshot(true, "").conky_lines(), vec!["> 50% CHG"]);
    }

    #[test]
    fn publish_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        snapshot(false, "").publish(&path).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["stats"]["cycle_count"], 0);
        assert_eq!(v["time_remaining"]["hours"], 2);
    }
}
