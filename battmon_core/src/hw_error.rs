//! Maps `Box<dyn Error>` from the sensor trait boundary to typed `EstimatorError`.
//!
//! `battmon_traits::PowerSensor` returns `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `battmon_hardware::HwError` downcasting.

use crate::error::EstimatorError;

/// Map a sensor-boundary error to a typed `EstimatorError`.
///
/// Known hardware error types are downcast first; anything else falls back
/// to string heuristics.
pub fn map_sensor_error(e: &(dyn std::error::Error + 'static)) -> EstimatorError {
    #[cfg(feature = "hardware-errors")]
    {
        use battmon_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Overflow => EstimatorError::SensorTransient(hw.to_string()),
                HwError::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                    EstimatorError::SensorTransient(hw.to_string())
                }
                other => EstimatorError::Sensor(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("overflow") {
        EstimatorError::SensorTransient(s)
    } else {
        EstimatorError::Sensor(s)
    }
}
