use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum EstimatorError {
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("transient sensor error: {0}")]
    SensorTransient(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("telemetry error: {0}")]
    Telemetry(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EstimatorError {
    fn from(e: std::io::Error) -> Self {
        EstimatorError::Io(e.to_string())
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("invalid discharge curve: {0}")]
    InvalidCurve(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
