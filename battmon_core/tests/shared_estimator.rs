//! One estimator shared between a sampling thread and readers.

use std::sync::Arc;
use std::thread;

use battmon_core::Estimator;
use battmon_traits::clock::test_clock::TestClock;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn estimator_is_send_and_sync() {
    assert_send_sync::<Estimator>();
    assert_send_sync::<Arc<Estimator>>();
}

#[test]
fn readers_see_consistent_state_while_sampling() {
    let clock = TestClock::new();
    let est = Arc::new(
        Estimator::builder()
            .with_clock(clock.clone())
            .with_initial_soc(80.0)
            .build()
            .unwrap(),
    );

    let writer = {
        let est = Arc::clone(&est);
        let clock = clock.clone();
        thread::spawn(move || {
            for i in 0..2000u32 {
                clock.advance_secs(5);
                let (v, ma) = if i % 400 < 200 {
                    (11.5, -850.0)
                } else {
                    (12.2, 1500.0)
                };
                est.record_sample(v, ma, v * f64::abs(ma));
            }
        })
    };

    while !writer.is_finished() {
        let soc = est.hybrid_soc();
        assert!((0.0..=100.0).contains(&soc), "soc = {soc}");
        let stats = est.stats();
        assert!(stats.effective_capacity_mah > 0.0);
        let snap = est.snapshot();
        assert!((0.0..=100.0).contains(&snap.percent));
        assert_eq!(snap.voltage.is_some(), snap.current_ma.is_some());
    }
    writer.join().unwrap();

    let last = est.last_reading().unwrap();
    assert_eq!(last.voltage, 12.2);
    assert!(est.is_charging());
}
