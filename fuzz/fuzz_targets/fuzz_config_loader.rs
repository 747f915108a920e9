#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate must reject bad input without panicking; a config
    // that validates must also build an estimator.
    let Ok(cfg) = battmon_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let est = battmon_core::Estimator::builder()
        .with_config(battmon_core::EstimatorCfg::from(&cfg))
        .build();
    assert!(est.is_ok(), "validated config rejected by builder: {:?}", est.err());
});
