use std::sync::atomic::AtomicBool;
use std::time::Duration;

use battmon_core::Estimator;
use battmon_core::mocks::{NoopSensor, SeqSensor};
use battmon_core::runner::{MonitorOpts, run_monitor, sample_once};
use battmon_core::{EstimatorError, MemoryTelemetry, ProfileStore};
use battmon_traits::{PowerReading, SystemClock};

#[test]
fn monitor_runs_until_sample_budget_and_publishes_status() {
    let dir = tempfile::tempdir().unwrap();
    let status = dir.path().join("status.json");
    let sink = MemoryTelemetry::new();
    let store = ProfileStore::in_dir(dir.path());
    let est = Estimator::builder()
        .with_telemetry(sink.clone())
        .with_store(store.clone())
        .build()
        .unwrap();
    let sensor = SeqSensor::new([
        PowerReading::new(11.5, -850.0, 9775.0),
        PowerReading::new(f64::NAN, -850.0, 9775.0),
        PowerReading::new(11.5, -850.0, 9775.0),
        PowerReading::new(11.5, -850.0, 9775.0),
    ]);
    let opts = MonitorOpts {
        period: Duration::from_millis(5),
        status_path: Some(status.clone()),
        max_samples: Some(3),
    };
    let stop = AtomicBool::new(false);
    let mut seen = 0;
    let summary = run_monitor(sensor, SystemClock::new(), &est, &opts, &stop, |snap| {
        assert!(snap.percent > 0.0);
        seen += 1;
    });
    assert_eq!(summary.samples, 3);
    assert_eq!(seen, 3);
    assert_eq!(sink.rows().len(), 3);
    assert!(status.exists());
    // closed on the way out
    assert!(store.load(3400.0).last_soc.is_some());
}

#[test]
fn monitor_returns_when_stopped() {
    let est = Estimator::builder().build().unwrap();
    let stop = AtomicBool::new(true);
    let summary = run_monitor(
        NoopSensor,
        SystemClock::new(),
        &est,
        &MonitorOpts::default(),
        &stop,
        |_| {},
    );
    assert_eq!(summary.samples, 0);
}

#[test]
fn sample_once_rejects_bad_readings() {
    let est = Estimator::builder().build().unwrap();
    let err = sample_once(&mut NoopSensor, &est).unwrap_err();
    assert!(matches!(err, EstimatorError::Sensor(_)));

    let mut nan = SeqSensor::new([PowerReading::new(f64::NAN, 0.0, 0.0)]);
    let err = sample_once(&mut nan, &est).unwrap_err();
    assert!(matches!(err, EstimatorError::SensorTransient(_)));
    assert_eq!(est.voltage_soc(), None);

    let mut ok = SeqSensor::new([PowerReading::new(11.5, -850.0, 9775.0)]);
    let (_, soc) = sample_once(&mut ok, &est).unwrap();
    assert!((soc - 50.0).abs() < 1e-9);
}
