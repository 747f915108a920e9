//! Human-readable error descriptions and structured JSON error formatting.

use battmon_core::error::{BuildError, EstimatorError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/battmon.toml for a sample."
            ),
            BuildError::InvalidCurve(msg) => format!(
                "What happened: The discharge curve is unusable ({msg}).\nLikely causes: Rows out of order, or the table does not run from 100 down to 0 percent.\nHow to fix: Sort the CSV by descending voltage and make the first row 100 and the last row 0."
            ),
        };
    }

    if let Some(ee) = err.downcast_ref::<EstimatorError>() {
        return match ee {
            EstimatorError::Sensor(m) | EstimatorError::SensorTransient(m) => format!(
                "What happened: Could not read the INA219 ({m}).\nLikely causes: I2C disabled, wrong bus or address, loose wiring, or missing permissions on /dev/i2c-*.\nHow to fix: Check [sensor] in the config, run `i2cdetect -y 1`, and make sure the user is in the i2c group."
            ),
            EstimatorError::Persistence(m) => format!(
                "What happened: Could not read or write learned data ({m}).\nLikely causes: Data directory missing or not writable.\nHow to fix: Pass --data-dir or fix permissions on the data directory."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        return format!(
            "What happened: The config file is not valid TOML.\nLikely causes: Typo, wrong value type, or an unknown notifier name.\nHow to fix: Fix the file and rerun. Parser said: {te}"
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("curve csv must have headers") {
        return "Invalid headers in discharge curve CSV. Expected 'voltage,percent'.".to_string();
    }

    if lower.contains("i2c") || lower.contains("ina219") {
        return format!(
            "What happened: Failed to initialize the INA219.\nLikely causes: I2C not enabled, wrong sensor.i2c_bus or sensor.address.\nHow to fix: Enable I2C (raspi-config), check the address with `i2cdetect`, or run with --sim. Original: {msg}"
        );
    }

    if lower.starts_with("pack.")
        || lower.starts_with("charge.")
        || lower.starts_with("calibration.")
        || lower.starts_with("learning")
        || lower.starts_with("warnings.")
        || lower.starts_with("runtime.")
        || lower.starts_with("persistence.")
        || lower.starts_with("sensor.")
        || lower.starts_with("shutdown.")
        || lower.contains("discharge curve")
    {
        return format!(
            "What happened: Configuration is invalid: {msg}.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Sensor failures exit 3 so status bars can tell "no reading" apart from
/// a broken install; everything else exits 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<EstimatorError>() {
        Some(EstimatorError::Sensor(_) | EstimatorError::SensorTransient(_)) => 3,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "InvalidConfig",
            BuildError::InvalidCurve(_) => "InvalidCurve",
        };
    }
    match err.downcast_ref::<EstimatorError>() {
        Some(EstimatorError::Sensor(_) | EstimatorError::SensorTransient(_)) => "Sensor",
        Some(EstimatorError::Persistence(_)) => "Persistence",
        Some(EstimatorError::Telemetry(_)) => "Telemetry",
        Some(EstimatorError::Config(_)) => "Config",
        Some(EstimatorError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_errors_get_their_own_exit_code() {
        let e = eyre::Report::new(EstimatorError::Sensor("i2c nack".into()));
        assert_eq!(exit_code_for_error(&e), 3);
        assert!(humanize(&e).contains("i2cdetect"));

        let other = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&other), 1);
    }

    #[test]
    fn json_error_carries_reason() {
        let e = eyre::Report::new(BuildError::InvalidConfig("nominal capacity must be > 0"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "InvalidConfig");
        assert!(v["message"].as_str().unwrap().contains("nominal capacity"));
    }

    #[test]
    fn validation_messages_are_recognised() {
        let e = eyre::eyre!("runtime.max_hours must be > 0");
        assert!(humanize(&e).starts_with("What happened: Configuration is invalid"));
    }
}
