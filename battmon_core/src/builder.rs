//! Builder for [`Estimator`].
//!
//! Every collaborator is optional: no store means nothing is persisted, no
//! telemetry means rows are dropped, no notifier means warnings only reach
//! the log.

use std::sync::Arc;

use battmon_traits::{Clock, Notifier, SystemClock};

use crate::charge::ChargeStateTracker;
use crate::config::EstimatorCfg;
use crate::curve::VoltageCurve;
use crate::error::{BuildError, Result};
use crate::estimator::{Estimator, EstimatorInner};
use crate::history::SampleHistory;
use crate::learner::{CapacityLearner, SessionState};
use crate::profile::{LearnedProfile, ProfileStore};
use crate::telemetry::{NullTelemetry, TelemetrySink};
use crate::warning::WarningPolicy;

#[derive(Default)]
pub struct EstimatorBuilder {
    cfg: Option<EstimatorCfg>,
    curve: Option<VoltageCurve>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    store: Option<ProfileStore>,
    profile: Option<LearnedProfile>,
    telemetry: Option<Box<dyn TelemetrySink + Send>>,
    notifier: Option<Box<dyn Notifier + Send>>,
    initial_soc: Option<f64>,
}

impl EstimatorBuilder {
    pub fn with_config(mut self, cfg: EstimatorCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn with_curve(mut self, curve: VoltageCurve) -> Self {
        self.curve = Some(curve);
        self
    }

    pub fn with_clock<C: Clock + Send + Sync + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Load the profile from `store` at build and save back to it.
    pub fn with_store(mut self, store: ProfileStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Start from this profile instead of loading one.
    pub fn with_profile(mut self, profile: LearnedProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_telemetry<T: TelemetrySink + Send + 'static>(mut self, sink: T) -> Self {
        self.telemetry = Some(Box::new(sink));
        self
    }

    pub fn with_notifier<N: Notifier + Send + 'static>(mut self, notifier: N) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Seed the coulomb integral, overriding any persisted `last_soc`.
    pub fn with_initial_soc(mut self, soc: f64) -> Self {
        self.initial_soc = Some(soc);
        self
    }

    pub fn build(self) -> Result<Estimator> {
        let cfg = self.cfg.unwrap_or_default();
        validate(&cfg)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(SystemClock::new()),
        };
        let now = clock.now();

        let profile = match (self.profile, &self.store) {
            (Some(p), _) => p,
            (None, Some(store)) => store.load(cfg.nominal_capacity_mah),
            (None, None) => LearnedProfile::with_nominal(cfg.nominal_capacity_mah),
        };
        // restored SOC leaves the session start unknown until the next full charge
        let coulomb_soc = self.initial_soc.or(profile.last_soc);

        let inner = EstimatorInner {
            curve: self.curve.unwrap_or_default(),
            charge: ChargeStateTracker::new(cfg.charge.current_threshold_ma, cfg.charge.settle),
            current_hist: SampleHistory::new(cfg.runtime.history_len),
            power_hist: SampleHistory::new(cfg.runtime.history_len),
            coulomb_soc,
            voltage_soc: None,
            last_sample_at: None,
            last_reading: None,
            profile,
            session: SessionState::new(now),
            warnings: WarningPolicy::new(cfg.warnings.clone()),
            learner: CapacityLearner::new(cfg.learning.clone()),
            store: self.store,
            telemetry: self.telemetry.unwrap_or_else(|| Box::new(NullTelemetry)),
            notifier: self.notifier,
            last_save_at: now,
            closed: false,
            cfg,
        };
        tracing::debug!(
            capacity_mah = inner.profile.effective_capacity_mah,
            restored_soc = ?inner.coulomb_soc,
            "estimator built"
        );
        Ok(Estimator::from_parts(inner, clock))
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(cfg: &EstimatorCfg) -> Result<()> {
    if !(cfg.nominal_capacity_mah.is_finite() && cfg.nominal_capacity_mah > 0.0) {
        return Err(invalid("nominal_capacity_mah must be > 0"));
    }
    let cal = &cfg.calibration;
    if !(0.0..=1.0).contains(&cal.drift_weight) {
        return Err(invalid("drift_weight must be in [0, 1]"));
    }
    if !(cal.critical_voltage < cal.full_voltage) {
        return Err(invalid("critical_voltage must be below full_voltage"));
    }
    if cal
        .clamp_bands
        .iter()
        .any(|(v, s)| !v.is_finite() || !(0.0..=100.0).contains(s))
    {
        return Err(invalid("clamp band must have a finite voltage and soc in [0, 100]"));
    }
    let l = &cfg.learning;
    if !(l.min_capacity_mah > 0.0 && l.min_capacity_mah < l.max_capacity_mah) {
        return Err(invalid("learning capacity range is empty"));
    }
    if l.max_samples == 0 {
        return Err(invalid("max_samples must be >= 1"));
    }
    if cfg.runtime.history_len == 0 {
        return Err(invalid("history_len must be >= 1"));
    }
    if !(cfg.runtime.max_hours > 0.0) {
        return Err(invalid("max_hours must be > 0"));
    }
    if cfg.warnings.thresholds.iter().any(|t| !(0.0..=100.0).contains(t)) {
        return Err(invalid("warning thresholds must be in [0, 100]"));
    }
    Ok(())
}
