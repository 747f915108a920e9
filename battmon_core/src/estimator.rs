//! Hybrid state-of-charge estimator.
//!
//! Coulomb counting carries the estimate between samples; the voltage curve
//! anchors it at full and empty and pulls it back slowly once the terminal
//! voltage has settled. All mutable state lives behind one mutex so the UI,
//! the status helper and the watchdog can share a single `Arc<Estimator>`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use battmon_traits::{Clock, Notifier, PowerReading};
use chrono::SecondsFormat;

use crate::charge::ChargeStateTracker;
use crate::config::EstimatorCfg;
use crate::curve::VoltageCurve;
use crate::error::EstimatorError;
use crate::history::SampleHistory;
use crate::learner::{CapacityLearner, LearnOutcome, SessionState};
use crate::profile::{LearnedProfile, ProfileStore};
use crate::runtime::{self, TimeEstimate};
use crate::status::{Stats, StatusSnapshot};
use crate::telemetry::{TelemetryRow, TelemetrySink};
use crate::util::{SECS_PER_HOUR, clamp_percent};
use crate::warning::WarningPolicy;

pub struct Estimator {
    inner: Mutex<EstimatorInner>,
    clock: Arc<dyn Clock + Send + Sync>,
}

pub(crate) struct EstimatorInner {
    pub(crate) cfg: EstimatorCfg,
    pub(crate) curve: VoltageCurve,
    pub(crate) charge: ChargeStateTracker,
    pub(crate) current_hist: SampleHistory,
    pub(crate) power_hist: SampleHistory,
    pub(crate) coulomb_soc: Option<f64>,
    pub(crate) voltage_soc: Option<f64>,
    pub(crate) last_sample_at: Option<Instant>,
    pub(crate) last_reading: Option<PowerReading>,
    pub(crate) profile: LearnedProfile,
    pub(crate) session: SessionState,
    pub(crate) warnings: WarningPolicy,
    pub(crate) learner: CapacityLearner,
    pub(crate) store: Option<ProfileStore>,
    pub(crate) telemetry: Box<dyn TelemetrySink + Send>,
    pub(crate) notifier: Option<Box<dyn Notifier + Send>>,
    pub(crate) last_save_at: Instant,
    pub(crate) closed: bool,
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let g = self.lock();
        f.debug_struct("Estimator")
            .field("coulomb_soc", &g.coulomb_soc)
            .field("voltage_soc", &g.voltage_soc)
            .field("charging", &g.charge.is_charging())
            .field("capacity_mah", &g.profile.effective_capacity_mah)
            .finish()
    }
}

impl Estimator {
    pub fn builder() -> crate::builder::EstimatorBuilder {
        crate::builder::EstimatorBuilder::default()
    }

    pub(crate) fn from_parts(inner: EstimatorInner, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            inner: Mutex::new(inner),
            clock,
        }
    }

    // State is plain numbers; a panic mid-update leaves it usable.
    fn lock(&self) -> MutexGuard<'_, EstimatorInner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Fold one reading into the estimate and return the hybrid SOC.
    ///
    /// `current_ma` is signed, positive while charging. Non-finite input is
    /// not rejected here; callers filter it.
    pub fn record_sample(&self, voltage: f64, current_ma: f64, power_mw: f64) -> f64 {
        let now = self.clock.now();
        let mut g = self.lock();
        g.record(voltage, current_ma, power_mw, now, self.clock.as_ref())
    }

    pub fn record(&self, reading: &PowerReading) -> f64 {
        self.record_sample(reading.voltage, reading.current_ma, reading.power_mw)
    }

    /// Coulomb SOC clamped to [0, 100]; voltage SOC before the first
    /// integral exists; 0 before any sample.
    pub fn hybrid_soc(&self) -> f64 {
        self.lock().hybrid()
    }

    pub fn voltage_soc(&self) -> Option<f64> {
        self.lock().voltage_soc
    }

    pub fn coulomb_soc(&self) -> Option<f64> {
        self.lock().coulomb_soc
    }

    pub fn is_charging(&self) -> bool {
        self.lock().charge.is_charging()
    }

    pub fn is_settled(&self) -> bool {
        self.lock().charge.is_settled()
    }

    /// Runtime left at the smoothed draw. `None` while charging.
    pub fn time_remaining(&self, percent: f64, current_ma: f64) -> Option<TimeEstimate> {
        self.lock().time_remaining(percent, current_ma)
    }

    /// Time until full at the smoothed charge current. `None` unless charging.
    pub fn time_to_full(&self, percent: f64, current_ma: f64) -> Option<TimeEstimate> {
        self.lock().time_to_full(percent, current_ma)
    }

    pub fn format_time_remaining(&self, percent: f64, current_ma: f64) -> String {
        self.lock().format_time(percent, current_ma)
    }

    pub fn stats(&self) -> Stats {
        self.lock().stats()
    }

    pub fn profile(&self) -> LearnedProfile {
        self.lock().profile.clone()
    }

    pub fn last_reading(&self) -> Option<PowerReading> {
        self.lock().last_reading
    }

    /// Consistent view for status output, built under one lock.
    pub fn snapshot(&self) -> StatusSnapshot {
        let g = self.lock();
        let percent = g.hybrid();
        let current = g.last_reading.map_or(0.0, |r| r.current_ma);
        StatusSnapshot {
            timestamp: self
                .clock
                .wall()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            percent,
            voltage: g.last_reading.map(|r| r.voltage),
            current_ma: g.last_reading.map(|r| r.current_ma),
            charging: g.charge.is_charging(),
            settled: g.charge.is_settled(),
            time_remaining: g.time_remaining(percent, current),
            time_to_full: g.time_to_full(percent, current),
            time_text: g.format_time(percent, current),
            stats: g.stats(),
        }
    }

    /// Persist the profile now (stamps `last_soc`).
    pub fn save_profile(&self) -> Result<(), EstimatorError> {
        let unix = self.clock.unix_secs();
        let now = self.clock.now();
        let mut g = self.lock();
        g.save(unix, now)
    }

    /// Save the profile and flush telemetry. Safe to call more than once.
    pub fn close(&self) {
        let unix = self.clock.unix_secs();
        let now = self.clock.now();
        let mut g = self.lock();
        if g.closed {
            return;
        }
        g.closed = true;
        if let Err(e) = g.save(unix, now) {
            tracing::warn!(error = %e, "profile save on close failed");
        }
        if let Err(e) = g.telemetry.flush() {
            tracing::warn!(error = %e, "telemetry flush on close failed");
        }
        tracing::debug!("estimator closed");
    }
}

impl EstimatorInner {
    fn hybrid(&self) -> f64 {
        match (self.coulomb_soc, self.voltage_soc) {
            (Some(c), _) => clamp_percent(c),
            (None, Some(v)) => v,
            (None, None) => 0.0,
        }
    }

    fn record(
        &mut self,
        voltage: f64,
        current_ma: f64,
        power_mw: f64,
        now: Instant,
        clock: &(dyn Clock + Send + Sync),
    ) -> f64 {
        let update = self.charge.update(current_ma, now);
        let charging = update.charging;
        let settled = self.charge.is_settled();
        if update.transitioned {
            tracing::info!(charging, "charge state changed");
        }
        let v_soc = self.curve.voltage_to_percent(voltage);
        self.voltage_soc = Some(v_soc);

        self.current_hist.push(current_ma.abs());
        self.power_hist.push(power_mw);
        if let Some(avg) = self.power_hist.mean() {
            self.profile.avg_power_mw = avg;
        }

        let mut soc = match self.coulomb_soc {
            Some(c) => c,
            None => {
                self.session.start_soc = Some(v_soc);
                v_soc
            }
        };

        if let Some(prev) = self.last_sample_at {
            let dt_h = now.saturating_duration_since(prev).as_secs_f64() / SECS_PER_HOUR;
            let mah = current_ma.abs() * dt_h;
            let delta = mah / self.profile.effective_capacity_mah * 100.0;
            if charging {
                soc = (soc + delta).min(100.0);
            } else {
                soc = (soc - delta).max(0.0);
                self.session.discharge_mah += mah;
                self.profile.total_discharge_mah += mah;
            }
        }

        let cal = &self.cfg.calibration;
        if voltage >= cal.full_voltage
            && current_ma.abs() < cal.full_current_max_ma
            && settled
            && !charging
        {
            if soc < cal.learn_below_soc {
                let outcome = self.learner.on_full_charge(
                    &mut self.session,
                    &mut self.profile,
                    clock.unix_secs(),
                    now,
                );
                self.log_learning(outcome);
                if outcome.counted() {
                    self.coulomb_soc = Some(soc);
                    if let Err(e) = self.save(clock.unix_secs(), now) {
                        tracing::warn!(error = %e, "profile save after full charge failed");
                    }
                }
            }
            tracing::debug!(from = soc, to = v_soc.min(100.0), "full-charge calibration");
            soc = v_soc.min(100.0);
        }

        let cal = &self.cfg.calibration;
        if voltage <= cal.critical_voltage && !charging {
            tracing::debug!(from = soc, to = v_soc.max(0.0), "empty calibration");
            soc = v_soc.max(0.0);
        }

        if settled && !charging {
            let w = cal.drift_weight;
            soc = soc * (1.0 - w) + v_soc * w;
        }

        if charging || !settled {
            for &(below_v, max_soc) in &cal.clamp_bands {
                if voltage < below_v {
                    soc = soc.min(max_soc);
                }
            }
        }

        self.coulomb_soc = Some(soc);
        self.last_sample_at = Some(now);
        self.last_reading = Some(PowerReading::new(voltage, current_ma, power_mw));

        let hybrid = clamp_percent(soc);
        self.dispatch_warning(hybrid, charging, now);

        let row = TelemetryRow {
            timestamp: clock.wall().to_rfc3339_opts(SecondsFormat::Millis, true),
            voltage,
            current_ma,
            power_mw,
            voltage_soc: v_soc,
            coulomb_soc: self.coulomb_soc,
            hybrid_soc: hybrid,
            charging,
            capacity_mah: self.profile.effective_capacity_mah,
        };
        if let Err(e) = self.telemetry.record(&row) {
            tracing::warn!(error = %e, "telemetry write failed");
        }

        if now.saturating_duration_since(self.last_save_at) >= self.cfg.persistence.save_interval
            && let Err(e) = self.save(clock.unix_secs(), now)
        {
            tracing::warn!(error = %e, "periodic profile save failed");
        }

        tracing::debug!(
            voltage,
            current_ma,
            voltage_soc = v_soc,
            hybrid_soc = hybrid,
            charging,
            settled,
            "sample recorded"
        );
        hybrid
    }

    fn log_learning(&self, outcome: LearnOutcome) {
        match outcome {
            LearnOutcome::Ignored => {}
            LearnOutcome::CycleOnly => {
                tracing::info!(cycles = self.profile.cycle_count, "charge cycle counted");
            }
            LearnOutcome::Rejected { observed } => tracing::info!(
                observed_mah = observed,
                cycles = self.profile.cycle_count,
                "implausible capacity sample rejected"
            ),
            LearnOutcome::Learned { observed, capacity } => tracing::info!(
                observed_mah = observed,
                capacity_mah = capacity,
                cycles = self.profile.cycle_count,
                "learned capacity updated"
            ),
        }
    }

    fn dispatch_warning(&mut self, percent: f64, charging: bool, now: Instant) {
        let Some(w) = self.warnings.evaluate(percent, charging, now) else {
            return;
        };
        tracing::warn!(threshold = w.threshold, percent, "{}", w.title);
        if let Some(n) = &self.notifier
            && let Err(e) = n.notify(w.severity.urgency(), w.title, &w.body)
        {
            tracing::warn!(error = %e, "notification delivery failed");
        }
    }

    fn avg_current(&self, current_ma: f64) -> f64 {
        runtime::avg_current_ma(&self.current_hist, current_ma, &self.cfg.runtime)
    }

    fn time_remaining(&self, percent: f64, current_ma: f64) -> Option<TimeEstimate> {
        if self.charge.is_charging() {
            return None;
        }
        let mah = runtime::remaining_mah(percent, self.profile.effective_capacity_mah);
        runtime::project(mah, self.avg_current(current_ma), &self.cfg.runtime)
    }

    fn time_to_full(&self, percent: f64, current_ma: f64) -> Option<TimeEstimate> {
        if !self.charge.is_charging() {
            return None;
        }
        let mah = runtime::to_full_mah(percent, self.profile.effective_capacity_mah);
        runtime::project(mah, self.avg_current(current_ma), &self.cfg.runtime)
    }

    fn format_time(&self, percent: f64, current_ma: f64) -> String {
        let charging = self.charge.is_charging();
        let est = if charging {
            self.time_to_full(percent, current_ma)
        } else {
            self.time_remaining(percent, current_ma.abs())
        };
        runtime::format_estimate(charging, est)
    }

    fn stats(&self) -> Stats {
        Stats {
            effective_capacity_mah: self.profile.effective_capacity_mah,
            cycle_count: self.profile.cycle_count,
            avg_power_mw: self.profile.avg_power_mw,
            nominal_capacity_mah: self.cfg.nominal_capacity_mah,
            voltage_soc: self.voltage_soc,
            coulomb_soc: self.coulomb_soc,
        }
    }

    fn save(&mut self, unix: f64, now: Instant) -> Result<(), EstimatorError> {
        self.last_save_at = now;
        if let Some(soc) = self.coulomb_soc {
            self.profile.last_soc = Some(soc);
            self.profile.last_soc_time = Some(unix);
        }
        match &self.store {
            Some(store) => store.save(&self.profile),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::MemoryTelemetry;
    use battmon_traits::clock::test_clock::TestClock;

    fn estimator(clock: &TestClock) -> Estimator {
        Estimator::builder()
            .with_clock(clock.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn first_sample_seeds_from_voltage() {
        let clock = TestClock::new();
        let est = estimator(&clock);
        assert_eq!(est.hybrid_soc(), 0.0);
        let soc = est.record_sample(11.5, -850.0, 9775.0);
        assert!((soc - 50.0).abs() < 1e-9);
        assert_eq!(est.coulomb_soc(), Some(50.0));
        assert!(!est.is_charging());
    }

    #[test]
    fn unsettled_discharge_is_clamped_by_voltage() {
        let clock = TestClock::new();
        let est = Estimator::builder()
            .with_clock(clock.clone())
            .with_initial_soc(100.0)
            .build()
            .unwrap();
        let soc = est.record_sample(11.9, -850.0, 10115.0);
        assert_eq!(soc, 80.0);
    }

    #[test]
    fn telemetry_row_per_sample() {
        let clock = TestClock::new();
        let sink = MemoryTelemetry::new();
        let est = Estimator::builder()
            .with_clock(clock.clone())
            .with_telemetry(sink.clone())
            .build()
            .unwrap();
        est.record_sample(11.5, -850.0, 9775.0);
        clock.advance_secs(5);
        est.record_sample(11.5, -850.0, 9775.0);
        let rows = sink.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].capacity_mah, 3400.0);
        assert!(!rows[1].charging);
    }

    #[test]
    fn close_is_idempotent() {
        let clock = TestClock::new();
        let est = estimator(&clock);
        est.record_sample(11.5, -850.0, 9775.0);
        est.close();
        est.close();
    }
}
