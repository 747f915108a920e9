//! Debounced low-battery warnings.

use battmon_traits::Urgency;
use std::time::Instant;

use crate::config::WarningCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Notice,
    Low,
    Critical,
}

impl Severity {
    pub fn urgency(self) -> Urgency {
        match self {
            Severity::Notice => Urgency::Normal,
            Severity::Low | Severity::Critical => Urgency::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub threshold: f64,
    pub severity: Severity,
    pub title: &'static str,
    pub body: String,
}

/// Fires each threshold once per discharge; charging re-arms all of them.
#[derive(Debug, Clone)]
pub struct WarningPolicy {
    cfg: WarningCfg,
    fired: Vec<bool>,
    last_warning_at: Option<Instant>,
}

impl WarningPolicy {
    pub fn new(mut cfg: WarningCfg) -> Self {
        cfg.thresholds.sort_by(|a, b| b.total_cmp(a));
        cfg.thresholds.dedup();
        let fired = vec![false; cfg.thresholds.len()];
        Self {
            cfg,
            fired,
            last_warning_at: None,
        }
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.cfg.thresholds
    }

    /// At most one warning per call.
    pub fn evaluate(&mut self, percent: f64, charging: bool, now: Instant) -> Option<Warning> {
        if charging {
            self.fired.iter_mut().for_each(|f| *f = false);
            return None;
        }
        if let Some(at) = self.last_warning_at
            && now.saturating_duration_since(at) < self.cfg.debounce
        {
            return None;
        }
        let idx = self
            .cfg
            .thresholds
            .iter()
            .zip(&self.fired)
            .position(|(t, fired)| percent <= *t && !*fired)?;
        self.fired[idx] = true;
        self.last_warning_at = Some(now);
        let threshold = self.cfg.thresholds[idx];
        Some(self.warning_for(threshold, percent))
    }

    fn warning_for(&self, threshold: f64, percent: f64) -> Warning {
        let (severity, title, body) = if threshold <= self.cfg.critical_threshold {
            (
                Severity::Critical,
                "CRITICAL BATTERY",
                format!("Battery at {percent:.0}%! Shutdown imminent."),
            )
        } else if threshold <= self.cfg.low_threshold {
            (
                Severity::Low,
                "Low Battery",
                format!("Battery at {percent:.0}%. Please connect charger."),
            )
        } else {
            (
                Severity::Notice,
                "Battery Warning",
                format!("Battery at {percent:.0}%."),
            )
        };
        Warning {
            threshold,
            severity,
            title,
            body,
        }
    }
}
