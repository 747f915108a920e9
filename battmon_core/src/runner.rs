//! Sampling loops that feed an [`Estimator`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use battmon_traits::clock::Clock;
use battmon_traits::{PowerReading, PowerSensor};

use crate::error::EstimatorError;
use crate::estimator::Estimator;
use crate::hw_error::map_sensor_error;
use crate::sampler::Sampler;
use crate::status::StatusSnapshot;

/// Read once and fold the reading in. Non-finite readings are rejected
/// before they reach the estimator.
pub fn sample_once<S: PowerSensor + ?Sized>(
    sensor: &mut S,
    estimator: &Estimator,
) -> Result<(PowerReading, f64), EstimatorError> {
    let r = sensor.read().map_err(|e| map_sensor_error(e.as_ref()))?;
    if !r.is_finite() {
        return Err(EstimatorError::SensorTransient(format!(
            "non-finite reading {r:?}"
        )));
    }
    Ok((r, estimator.record(&r)))
}

/// How often the monitor loop looks at the stop flag while idle.
const STOP_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct MonitorOpts {
    pub period: Duration,
    /// Publish a JSON snapshot here after every sample.
    pub status_path: Option<PathBuf>,
    /// Stop after this many accepted samples.
    pub max_samples: Option<u64>,
}

impl Default for MonitorOpts {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            status_path: None,
            max_samples: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub samples: u64,
    pub dropped: u64,
    pub read_errors: u64,
}

/// Sample in the background until `stop` is set (or `max_samples` is hit),
/// calling `on_sample` with a fresh snapshot after each accepted reading.
/// Closes the estimator on the way out.
pub fn run_monitor<S, C, F>(
    sensor: S,
    clock: C,
    estimator: &Estimator,
    opts: &MonitorOpts,
    stop: &AtomicBool,
    mut on_sample: F,
) -> MonitorSummary
where
    S: PowerSensor + Send + 'static,
    C: Clock + Send + Sync + 'static,
    F: FnMut(&StatusSnapshot),
{
    let sampler = Sampler::spawn(sensor, opts.period, clock);
    let mut summary = MonitorSummary::default();

    while !stop.load(Ordering::Relaxed) {
        let Some(r) = sampler.recv_timeout(STOP_POLL) else {
            continue;
        };
        if !r.is_finite() {
            summary.dropped += 1;
            tracing::warn!(?r, "dropping non-finite reading");
            continue;
        }
        estimator.record(&r);
        summary.samples += 1;

        let snap = estimator.snapshot();
        if let Some(path) = &opts.status_path
            && let Err(e) = snap.publish(path)
        {
            tracing::warn!(error = %e, "status publish failed");
        }
        on_sample(&snap);

        if opts.max_samples.is_some_and(|m| summary.samples >= m) {
            break;
        }
    }

    summary.read_errors = sampler.error_count();
    drop(sampler);
    estimator.close();
    tracing::info!(
        samples = summary.samples,
        dropped = summary.dropped,
        read_errors = summary.read_errors,
        "monitor stopped"
    );
    summary
}
