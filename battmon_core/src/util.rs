//! Small numeric helpers shared across the estimator.

/// Seconds per hour, for mA·s → mAh.
pub const SECS_PER_HOUR: f64 = 3600.0;

/// Clamp a percentage into [0, 100]. NaN passes through unchanged.
#[inline]
pub fn clamp_percent(p: f64) -> f64 {
    if p.is_nan() { p } else { p.clamp(0.0, 100.0) }
}

/// Split fractional hours into whole hours and floored minutes.
#[inline]
pub fn split_hours(hours: f64) -> (u32, u32) {
    let h = hours.trunc();
    let m = ((hours - h) * 60.0).floor();
    (h as u32, (m as u32).min(59))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_both_ends() {
        assert_eq!(clamp_percent(-1.0), 0.0);
        assert_eq!(clamp_percent(101.0), 100.0);
        assert_eq!(clamp_percent(42.5), 42.5);
        assert!(clamp_percent(f64::NAN).is_nan());
    }

    #[test]
    fn split_floors_minutes() {
        assert_eq!(split_hours(2.0), (2, 0));
        assert_eq!(split_hours(1.999), (1, 59));
        assert_eq!(split_hours(0.5), (0, 30));
    }
}
