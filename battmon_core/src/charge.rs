//! Charger detection and terminal-voltage settling.
//!
//! Terminal voltage jumps when the charger is plugged or unplugged, so the
//! voltage curve is only trusted once the charge state has been stable for
//! the settle duration. A process started on battery stays unsettled until
//! the charge state first changes.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeUpdate {
    pub charging: bool,
    /// Charge state differs from the previous sample.
    pub transitioned: bool,
}

#[derive(Debug, Clone)]
pub struct ChargeStateTracker {
    threshold_ma: f64,
    settle: Duration,
    charging: bool,
    changed_at: Option<Instant>,
    settled: bool,
}

impl ChargeStateTracker {
    pub fn new(threshold_ma: f64, settle: Duration) -> Self {
        Self {
            threshold_ma,
            settle,
            charging: false,
            changed_at: None,
            settled: false,
        }
    }

    pub fn update(&mut self, current_ma: f64, now: Instant) -> ChargeUpdate {
        let charging = current_ma > self.threshold_ma;
        let transitioned = charging != self.charging;
        if transitioned {
            self.charging = charging;
            self.changed_at = Some(now);
            self.settled = false;
        } else if let Some(at) = self.changed_at
            && now.saturating_duration_since(at) > self.settle
        {
            self.settled = true;
        }
        ChargeUpdate {
            charging,
            transitioned,
        }
    }

    pub fn is_charging(&self) -> bool {
        self.charging
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_unsettled_until_first_transition() {
        let t0 = Instant::now();
        let mut tr = ChargeStateTracker::new(10.0, Duration::from_secs(30));
        let u = tr.update(-800.0, t0);
        assert!(!u.charging && !u.transitioned);
        for mins in 1..=60 {
            tr.update(-800.0, t0 + Duration::from_secs(mins * 60));
            assert!(!tr.is_settled(), "settled after {mins} min without a transition");
        }
    }

    #[test]
    fn settles_strictly_after_window_following_transition() {
        let t0 = Instant::now();
        let mut tr = ChargeStateTracker::new(10.0, Duration::from_secs(30));
        tr.update(-800.0, t0);
        let u = tr.update(1200.0, t0 + Duration::from_secs(5));
        assert!(u.charging && u.transitioned);
        tr.update(1200.0, t0 + Duration::from_secs(35));
        assert!(!tr.is_settled(), "settling is strictly after the window");
        tr.update(1200.0, t0 + Duration::from_secs(36));
        assert!(tr.is_settled());
    }

    #[test]
    fn unplugging_unsettles() {
        let t0 = Instant::now();
        let mut tr = ChargeStateTracker::new(10.0, Duration::from_secs(30));
        tr.update(1200.0, t0);
        tr.update(1200.0, t0 + Duration::from_secs(40));
        assert!(tr.is_settled());
        let u = tr.update(-800.0, t0 + Duration::from_secs(45));
        assert!(!u.charging && u.transitioned);
        assert!(!tr.is_settled());
        tr.update(-800.0, t0 + Duration::from_secs(80));
        assert!(tr.is_settled());
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut tr = ChargeStateTracker::new(10.0, Duration::from_secs(30));
        assert!(!tr.update(10.0, Instant::now()).charging);
        assert!(tr.update(10.5, Instant::now()).charging);
    }
}
