//! Piecewise-linear voltage ↔ percent lookup.

use crate::error::BuildError;

/// 3S Li-ion resting-voltage curve, descending voltage.
/// Denser through the flat middle where small voltage errors cost the most.
pub const DEFAULT_3S_CURVE: [(f64, f64); 25] = [
    (12.60, 100.0),
    (12.50, 95.0),
    (12.40, 90.0),
    (12.30, 85.0),
    (12.20, 80.0),
    (12.00, 75.0),
    (11.90, 70.0),
    (11.80, 65.0),
    (11.70, 60.0),
    (11.60, 55.0),
    (11.50, 50.0),
    (11.40, 45.0),
    (11.30, 40.0),
    (11.20, 35.0),
    (11.10, 30.0),
    (11.00, 25.0),
    (10.80, 20.0),
    (10.60, 15.0),
    (10.40, 10.0),
    (10.20, 7.0),
    (10.00, 5.0),
    (9.80, 3.0),
    (9.60, 2.0),
    (9.40, 1.0),
    (9.00, 0.0),
];

/// Breakpoint table ordered by descending voltage, 100 % first, 0 % last.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageCurve {
    points: Vec<(f64, f64)>,
}

impl Default for VoltageCurve {
    fn default() -> Self {
        Self {
            points: DEFAULT_3S_CURVE.to_vec(),
        }
    }
}

impl VoltageCurve {
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, BuildError> {
        if points.len() < 2 {
            return Err(BuildError::InvalidCurve(format!(
                "need at least two breakpoints, got {}",
                points.len()
            )));
        }
        if points.iter().any(|(v, p)| !v.is_finite() || !p.is_finite()) {
            return Err(BuildError::InvalidCurve("breakpoints must be finite".into()));
        }
        if points[0].1 != 100.0 || points[points.len() - 1].1 != 0.0 {
            return Err(BuildError::InvalidCurve(
                "must run from 100 percent down to 0 percent".into(),
            ));
        }
        for w in points.windows(2) {
            if !(w[1].0 < w[0].0) || w[1].1 > w[0].1 {
                return Err(BuildError::InvalidCurve(format!(
                    "breakpoints ({}, {}) and ({}, {}) are out of order",
                    w[0].0, w[0].1, w[1].0, w[1].1
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Highest breakpoint voltage (100 %).
    pub fn max_voltage(&self) -> f64 {
        self.points[0].0
    }

    /// Lowest breakpoint voltage (0 %).
    pub fn min_voltage(&self) -> f64 {
        self.points[self.points.len() - 1].0
    }

    /// Voltage to percent. Clamps to 100/0 outside the table; non-finite
    /// input is not meaningful.
    pub fn voltage_to_percent(&self, voltage: f64) -> f64 {
        if voltage >= self.max_voltage() {
            return 100.0;
        }
        if voltage <= self.min_voltage() {
            return 0.0;
        }
        for w in self.points.windows(2) {
            let (v_high, p_high) = w[0];
            let (v_low, p_low) = w[1];
            if v_low <= voltage && voltage <= v_high {
                let ratio = (voltage - v_low) / (v_high - v_low);
                return p_low + ratio * (p_high - p_low);
            }
        }
        0.0
    }

    /// Percent to expected resting voltage. Clamps to the boundary voltages.
    pub fn percent_to_voltage(&self, percent: f64) -> f64 {
        if percent >= 100.0 {
            return self.max_voltage();
        }
        if percent <= 0.0 {
            return self.min_voltage();
        }
        for w in self.points.windows(2) {
            let (v_high, p_high) = w[0];
            let (v_low, p_low) = w[1];
            if p_low <= percent && percent <= p_high {
                if p_high == p_low {
                    return v_high;
                }
                let ratio = (percent - p_low) / (p_high - p_low);
                return v_low + ratio * (v_high - v_low);
            }
        }
        self.min_voltage()
    }
}

/// `VoltageCurve::voltage_to_percent` on the stock 3S table.
pub fn voltage_to_percent(voltage: f64) -> f64 {
    lookup_default(|c| c.voltage_to_percent(voltage))
}

/// `VoltageCurve::percent_to_voltage` on the stock 3S table.
pub fn percent_to_voltage(percent: f64) -> f64 {
    lookup_default(|c| c.percent_to_voltage(percent))
}

fn lookup_default(f: impl FnOnce(&VoltageCurve) -> f64) -> f64 {
    use std::sync::OnceLock;
    static DEFAULT: OnceLock<VoltageCurve> = OnceLock::new();
    f(DEFAULT.get_or_init(VoltageCurve::default))
}
