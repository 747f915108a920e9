use battmon_core::curve::{DEFAULT_3S_CURVE, percent_to_voltage, voltage_to_percent};
use battmon_core::Estimator;
use battmon_traits::clock::test_clock::TestClock;
use proptest::prelude::*;

proptest! {
    #[test]
    fn curve_is_monotone(a in 5.0f64..14.0, b in 5.0f64..14.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(voltage_to_percent(lo) <= voltage_to_percent(hi));
    }

    #[test]
    fn curve_stays_in_range(v in -100.0f64..100.0) {
        let p = voltage_to_percent(v);
        prop_assert!((0.0..=100.0).contains(&p));
    }

    #[test]
    fn curve_inverts_inside_table(v in 9.0f64..12.6) {
        let back = percent_to_voltage(voltage_to_percent(v));
        prop_assert!((back - v).abs() < 1e-6, "v={} back={}", v, back);
    }

    #[test]
    fn hybrid_soc_stays_bounded(
        steps in prop::collection::vec((8.0f64..13.5, -4000.0f64..4000.0, 0u64..600), 1..80),
        initial in prop::option::of(-50.0f64..150.0),
    ) {
        let clock = TestClock::new();
        let mut b = Estimator::builder().with_clock(clock.clone());
        if let Some(s) = initial {
            b = b.with_initial_soc(s);
        }
        let est = b.build().unwrap();
        for (v, i, dt) in steps {
            clock.advance_secs(dt);
            let soc = est.record_sample(v, i, v * i.abs());
            prop_assert!((0.0..=100.0).contains(&soc), "soc={}", soc);
            prop_assert!((0.0..=100.0).contains(&est.hybrid_soc()));
        }
    }
}

#[test]
fn table_endpoints() {
    let top = DEFAULT_3S_CURVE[0];
    let bottom = DEFAULT_3S_CURVE[DEFAULT_3S_CURVE.len() - 1];
    assert_eq!(voltage_to_percent(top.0), 100.0);
    assert_eq!(voltage_to_percent(bottom.0), 0.0);
    for (v, p) in DEFAULT_3S_CURVE {
        assert!((voltage_to_percent(v) - p).abs() < 1e-9);
    }
}
