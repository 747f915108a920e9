#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (Vec<(f64, f64)>, f64)| {
    let (points, probe) = input;
    // keep segment widths finite
    if points.iter().any(|(v, _)| v.abs() > 1e6) {
        return;
    }
    let Ok(curve) = battmon_core::VoltageCurve::new(points) else {
        return;
    };
    if !probe.is_finite() {
        return;
    }
    let p = curve.voltage_to_percent(probe);
    assert!((0.0..=100.0).contains(&p), "percent {p} out of range");
    let v = curve.percent_to_voltage(p);
    assert!(v >= curve.min_voltage() && v <= curve.max_voltage());
});
