//! Learned pack profile and its JSON store.
//!
//! The file is a flat JSON object (`learned_data.json`). Missing keys are
//! backfilled from defaults, so older or hand-edited files keep loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::atomic::write_atomic;
use crate::error::EstimatorError;

pub const PROFILE_FILE: &str = "learned_data.json";

/// Persisted capacity model and usage statistics.
///
/// Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnedProfile {
    pub effective_capacity_mah: f64,
    pub cycle_count: u64,
    pub total_discharge_mah: f64,
    pub avg_power_mw: f64,
    pub typical_draw_ma: f64,
    pub last_full_charge_time: Option<f64>,
    /// Oldest first; bounded by the learner.
    pub capacity_samples: Vec<f64>,
    pub last_soc: Option<f64>,
    pub last_soc_time: Option<f64>,
}

impl LearnedProfile {
    pub fn with_nominal(nominal_capacity_mah: f64) -> Self {
        Self {
            effective_capacity_mah: nominal_capacity_mah,
            cycle_count: 0,
            total_discharge_mah: 0.0,
            avg_power_mw: 9000.0,
            typical_draw_ma: 850.0,
            last_full_charge_time: None,
            capacity_samples: Vec::new(),
            last_soc: None,
            last_soc_time: None,
        }
    }
}

/// On-disk shape: every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredProfile {
    effective_capacity_mah: Option<f64>,
    cycle_count: Option<u64>,
    total_discharge_mah: Option<f64>,
    avg_power_mw: Option<f64>,
    typical_draw_ma: Option<f64>,
    last_full_charge_time: Option<f64>,
    capacity_samples: Option<Vec<f64>>,
    last_soc: Option<f64>,
    last_soc_time: Option<f64>,
}

impl StoredProfile {
    fn merge_into(self, mut p: LearnedProfile) -> LearnedProfile {
        if let Some(c) = self.effective_capacity_mah.filter(|c| c.is_finite() && *c > 0.0) {
            p.effective_capacity_mah = c;
        }
        if let Some(n) = self.cycle_count {
            p.cycle_count = n;
        }
        if let Some(t) = self.total_discharge_mah {
            p.total_discharge_mah = t;
        }
        if let Some(a) = self.avg_power_mw {
            p.avg_power_mw = a;
        }
        if let Some(d) = self.typical_draw_ma {
            p.typical_draw_ma = d;
        }
        if let Some(s) = self.capacity_samples {
            p.capacity_samples = s;
        }
        p.last_full_charge_time = self.last_full_charge_time;
        p.last_soc = self.last_soc.filter(|s| s.is_finite());
        p.last_soc_time = self.last_soc_time;
        p
    }
}

/// JSON file holding a [`LearnedProfile`].
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/learned_data.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PROFILE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet.
    pub fn try_load(
        &self,
        nominal_capacity_mah: f64,
    ) -> Result<Option<LearnedProfile>, EstimatorError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EstimatorError::Persistence(format!(
                    "read {}: {e}",
                    self.path.display()
                )));
            }
        };
        let stored: StoredProfile = serde_json::from_slice(&bytes).map_err(|e| {
            EstimatorError::Persistence(format!("parse {}: {e}", self.path.display()))
        })?;
        Ok(Some(
            stored.merge_into(LearnedProfile::with_nominal(nominal_capacity_mah)),
        ))
    }

    /// Load, falling back to defaults on a missing or unreadable file.
    pub fn load(&self, nominal_capacity_mah: f64) -> LearnedProfile {
        match self.try_load(nominal_capacity_mah) {
            Ok(Some(p)) => {
                tracing::debug!(
                    path = %self.path.display(),
                    capacity_mah = p.effective_capacity_mah,
                    cycles = p.cycle_count,
                    "loaded learned profile"
                );
                p
            }
            Ok(None) => LearnedProfile::with_nominal(nominal_capacity_mah),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring learned profile, using defaults");
                LearnedProfile::with_nominal(nominal_capacity_mah)
            }
        }
    }

    pub fn save(&self, profile: &LearnedProfile) -> Result<(), EstimatorError> {
        let json = serde_json::to_vec_pretty(profile)
            .map_err(|e| EstimatorError::Persistence(format!("serialize profile: {e}")))?;
        write_atomic(&self.path, &json).map_err(|e| {
            EstimatorError::Persistence(format!("write {}: {e}", self.path.display()))
        })
    }
}
