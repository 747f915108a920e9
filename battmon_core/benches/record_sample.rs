use battmon_core::Estimator;
use battmon_core::curve::voltage_to_percent;
use battmon_traits::clock::test_clock::TestClock;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

// Slow linear sag with a little ripple, like a steady desktop load.
fn synth_readings(n: usize) -> Vec<(f64, f64, f64)> {
    (0..n)
        .map(|i| {
            let v = 12.4 - (i as f64) * 0.0005 + ((i as f64) * 0.7).sin() * 0.01;
            let a = -850.0 + ((i as f64) * 0.3).cos() * 40.0;
            (v, a, v * a.abs())
        })
        .collect()
}

pub fn bench_record_sample(c: &mut Criterion) {
    let readings = synth_readings(1024);
    c.bench_function("record_sample_1024", |b| {
        b.iter_batched(
            || {
                let clock = TestClock::new();
                let est = Estimator::builder()
                    .with_clock(clock.clone())
                    .build()
                    .unwrap();
                (clock, est)
            },
            |(clock, est)| {
                for &(v, a, p) in &readings {
                    clock.advance(Duration::from_secs(5));
                    black_box(est.record_sample(v, a, p));
                }
            },
            BatchSize::SmallInput,
        );
    });
}

pub fn bench_curve_lookup(c: &mut Criterion) {
    c.bench_function("voltage_to_percent", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..360 {
                acc += voltage_to_percent(black_box(9.0 + f64::from(i) * 0.01));
            }
            acc
        });
    });
}

criterion_group!(benches, bench_record_sample, bench_curve_lookup);
criterion_main!(benches);
