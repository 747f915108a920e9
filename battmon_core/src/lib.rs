#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Hybrid state-of-charge estimation for a 3S Li-ion pack (hardware-agnostic).
//!
//! All sensor access goes through `battmon_traits::PowerSensor`; warnings go
//! out through `battmon_traits::Notifier`.
//!
//! ## Architecture
//!
//! - **Curve**: piecewise-linear voltage ↔ percent table (`curve`)
//! - **Charge state**: charger detection and voltage settling (`charge`)
//! - **Estimator**: coulomb counting anchored by voltage calibration (`estimator`)
//! - **Learning**: capacity inference from full-charge events (`learner`, `profile`)
//! - **Warnings**: debounced low-battery notifications (`warning`)
//! - **Telemetry**: one CSV row per sample (`telemetry`)
//! - **Runtime**: time remaining / to full (`runtime`)
//! - **Watchdog**: consecutive-low shutdown policy (`shutdown`)
//!
//! One `Estimator` per process, shared as `Arc<Estimator>`; every method
//! takes `&self` and serializes on a single internal lock.

pub mod atomic;
pub mod builder;
pub mod charge;
pub mod config;
pub mod conversions;
pub mod curve;
pub mod error;
pub mod estimator;
pub mod history;
pub mod hw_error;
pub mod learner;
pub mod mocks;
pub mod profile;
pub mod runner;
pub mod runtime;
pub mod sampler;
pub mod shutdown;
pub mod status;
pub mod telemetry;
pub mod util;
pub mod warning;

pub use builder::EstimatorBuilder;
pub use config::{
    CalibrationCfg, ChargeCfg, EstimatorCfg, LearningCfg, PersistenceCfg, RuntimeCfg,
    ShutdownCfg, WarningCfg,
};
pub use curve::{VoltageCurve, percent_to_voltage, voltage_to_percent};
pub use error::{BuildError, EstimatorError, Report, Result};
pub use estimator::Estimator;
pub use learner::LearnOutcome;
pub use profile::{LearnedProfile, ProfileStore};
pub use runtime::TimeEstimate;
pub use shutdown::{ShutdownDecision, ShutdownPolicy};
pub use status::{Stats, StatusSnapshot};
pub use telemetry::{CsvTelemetry, MemoryTelemetry, NullTelemetry, TelemetrySink};
