//! Capacity learning from full-charge events.
//!
//! A session starts at the last full charge (or at start-up). When the pack
//! is next seen full, the mAh drawn during the session divided by the
//! fraction of charge it started with gives one observed capacity.

use std::time::Instant;

use crate::config::LearningCfg;
use crate::profile::LearnedProfile;

/// Discharge accounting since the last full charge.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub start: Instant,
    /// SOC the session started from; unset until the first sample seeds it.
    pub start_soc: Option<f64>,
    pub discharge_mah: f64,
}

impl SessionState {
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            start_soc: None,
            discharge_mah: 0.0,
        }
    }

    fn reset_full(&mut self, now: Instant) {
        self.start = now;
        self.start_soc = Some(100.0);
        self.discharge_mah = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LearnOutcome {
    /// Too little discharge to count as a cycle.
    Ignored,
    /// Cycle counted; start SOC too low or unknown to infer capacity.
    CycleOnly,
    /// Cycle counted; observed capacity outside the plausible range.
    Rejected { observed: f64 },
    /// Cycle counted and the sample was kept.
    Learned { observed: f64, capacity: f64 },
}

impl LearnOutcome {
    /// Whether the profile changed and should be persisted now.
    pub fn counted(&self) -> bool {
        !matches!(self, LearnOutcome::Ignored)
    }
}

#[derive(Debug, Clone)]
pub struct CapacityLearner {
    cfg: LearningCfg,
}

impl CapacityLearner {
    pub fn new(cfg: LearningCfg) -> Self {
        Self { cfg }
    }

    pub fn on_full_charge(
        &self,
        session: &mut SessionState,
        profile: &mut LearnedProfile,
        now_unix: f64,
        now: Instant,
    ) -> LearnOutcome {
        let mut outcome = LearnOutcome::Ignored;
        if session.discharge_mah > self.cfg.min_session_discharge_mah {
            outcome = LearnOutcome::CycleOnly;
            if let Some(start_soc) = session.start_soc.filter(|s| *s > self.cfg.min_start_soc) {
                let observed = session.discharge_mah / (start_soc / 100.0);
                if self.cfg.min_capacity_mah < observed && observed < self.cfg.max_capacity_mah {
                    self.push_sample(profile, observed);
                    outcome = LearnOutcome::Learned {
                        observed,
                        capacity: profile.effective_capacity_mah,
                    };
                } else {
                    outcome = LearnOutcome::Rejected { observed };
                }
            }
            profile.cycle_count += 1;
            profile.last_full_charge_time = Some(now_unix);
        }
        session.reset_full(now);
        outcome
    }

    fn push_sample(&self, profile: &mut LearnedProfile, observed: f64) {
        let samples = &mut profile.capacity_samples;
        samples.push(observed);
        let max = self.cfg.max_samples.max(1);
        if samples.len() > max {
            samples.drain(..samples.len() - max);
        }
        if let Some(c) = weighted_capacity(samples) {
            profile.effective_capacity_mah = c;
        }
    }
}

/// Recency-weighted mean: weight `1 + 0.2·i`, oldest sample at `i = 0`.
pub fn weighted_capacity(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let (sum, wsum) = samples
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(s, ws), (i, c)| {
            let w = 1.0 + 0.2 * i as f64;
            (s + c * w, ws + w)
        });
    Some(sum / wsum)
}
