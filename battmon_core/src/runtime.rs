//! Runtime / time-to-full projections from smoothed current.

use crate::config::RuntimeCfg;
use crate::history::SampleHistory;
use crate::util::split_hours;

/// Whole hours plus floored minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TimeEstimate {
    pub hours: u32,
    pub minutes: u32,
}

impl TimeEstimate {
    pub fn from_hours(hours: f64) -> Self {
        let (hours, minutes) = split_hours(hours);
        Self { hours, minutes }
    }
}

/// Mean |current| over the history once it holds `min_history` samples,
/// otherwise the instantaneous |current|.
pub fn avg_current_ma(history: &SampleHistory, current_ma: f64, cfg: &RuntimeCfg) -> f64 {
    if history.len() >= cfg.min_history {
        history.mean().unwrap_or(current_ma.abs())
    } else {
        current_ma.abs()
    }
}

/// Project `remaining_mah` at `avg_ma`. `None` below the current floor or
/// outside `[0, max_hours]`.
pub fn project(remaining_mah: f64, avg_ma: f64, cfg: &RuntimeCfg) -> Option<TimeEstimate> {
    if !(avg_ma >= cfg.min_current_ma) {
        return None;
    }
    let hours = remaining_mah / avg_ma;
    if !(0.0..=cfg.max_hours).contains(&hours) {
        return None;
    }
    Some(TimeEstimate::from_hours(hours))
}

pub fn remaining_mah(percent: f64, capacity_mah: f64) -> f64 {
    percent / 100.0 * capacity_mah
}

pub fn to_full_mah(percent: f64, capacity_mah: f64) -> f64 {
    (100.0 - percent) / 100.0 * capacity_mah
}

/// Status-bar text for the estimate.
pub fn format_estimate(charging: bool, estimate: Option<TimeEstimate>) -> String {
    match (charging, estimate) {
        (true, Some(t)) if t.hours > 0 => format!("{}h {}m to full", t.hours, t.minutes),
        (true, Some(t)) => format!("{}m to full", t.minutes),
        (true, None) => "Charging...".to_string(),
        (false, Some(t)) if t.hours > 0 => format!("{}h {}m remaining", t.hours, t.minutes),
        (false, Some(t)) => format!("{}m remaining", t.minutes),
        (false, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn short_history_uses_instantaneous_current() {
        let cfg = RuntimeCfg::default();
        let mut h = SampleHistory::new(cfg.history_len);
        h.push(100.0);
        h.push(100.0);
        assert_eq!(avg_current_ma(&h, -850.0, &cfg), 850.0);
        h.push(400.0);
        assert_eq!(avg_current_ma(&h, -850.0, &cfg), 200.0);
    }

    #[rstest]
    #[case(1700.0, 850.0, Some(TimeEstimate { hours: 2, minutes: 0 }))]
    #[case(100.0, 29.9, None)]
    #[case(3400.0, 30.0, None)]
    #[case(1500.0, 30.0, Some(TimeEstimate { hours: 50, minutes: 0 }))]
    #[case(-1.0, 500.0, None)]
    fn projection_bounds(
        #[case] mah: f64,
        #[case] avg: f64,
        #[case] expected: Option<TimeEstimate>,
    ) {
        assert_eq!(project(mah, avg, &RuntimeCfg::default()), expected);
    }

    #[rstest]
    #[case(true, Some(TimeEstimate { hours: 1, minutes: 5 }), "1h 5m to full")]
    #[case(true, Some(TimeEstimate { hours: 0, minutes: 42 }), "42m to full")]
    #[case(true, None, "Charging...")]
    #[case(false, Some(TimeEstimate { hours: 3, minutes: 0 }), "3h 0m remaining")]
    #[case(false, Some(TimeEstimate { hours: 0, minutes: 7 }), "7m remaining")]
    #[case(false, None, "")]
    fn formatting(
        #[case] charging: bool,
        #[case] est: Option<TimeEstimate>,
        #[case] expected: &str,
    ) {
        assert_eq!(format_estimate(charging, est), expected);
    }
}
