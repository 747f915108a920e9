pub mod clock;

pub use clock::{Clock, SystemClock};

/// One reading from the pack monitor.
///
/// Current is signed: positive while the charger is pushing charge in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReading {
    /// Bus voltage in volts.
    pub voltage: f64,
    /// Current in milliamps, positive = charging.
    pub current_ma: f64,
    /// Power in milliwatts.
    pub power_mw: f64,
}

impl PowerReading {
    pub fn new(voltage: f64, current_ma: f64, power_mw: f64) -> Self {
        Self {
            voltage,
            current_ma,
            power_mw,
        }
    }

    /// True when every field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.voltage.is_finite() && self.current_ma.is_finite() && self.power_mw.is_finite()
    }
}

pub trait PowerSensor {
    fn read(&mut self) -> Result<PowerReading, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: PowerSensor + ?Sized> PowerSensor for Box<T> {
    fn read(&mut self) -> Result<PowerReading, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read()
    }
}

/// Notification urgency, mirroring the freedesktop levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

pub trait Notifier {
    fn notify(
        &self,
        urgency: Urgency,
        title: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn notify(
        &self,
        urgency: Urgency,
        title: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).notify(urgency, title, body)
    }
}
