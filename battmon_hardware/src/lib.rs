#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod ina219;
pub mod error;
pub mod notify;

use battmon_traits::{PowerReading, PowerSensor};

pub use notify::{LogNotifier, NotifySend};

/// Simulated pack: a steady discharge that sags the bus voltage a little
/// on every read. Handy for running the CLI away from the Pi.
pub struct SimulatedSensor {
    voltage: f64,
    current_ma: f64,
    step_v: f64,
    floor_v: f64,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self::discharging(12.1, -850.0)
    }

    /// Start at `voltage`, drawing `current_ma` (negative = discharge).
    pub fn discharging(voltage: f64, current_ma: f64) -> Self {
        Self {
            voltage,
            current_ma,
            step_v: 0.001,
            floor_v: 9.0,
        }
    }

    /// Build from `BATTMON_SIM_VOLTAGE` / `BATTMON_SIM_CURRENT_MA` when set.
    pub fn from_env() -> Self {
        let mut sim = Self::new();
        if let Some(v) = env_f64("BATTMON_SIM_VOLTAGE") {
            sim.voltage = v;
        }
        if let Some(i) = env_f64("BATTMON_SIM_CURRENT_MA") {
            sim.current_ma = i;
        }
        sim
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl PowerSensor for SimulatedSensor {
    fn read(&mut self) -> Result<PowerReading, Box<dyn std::error::Error + Send + Sync>> {
        let v = self.voltage;
        if self.current_ma < 0.0 {
            self.voltage = (self.voltage - self.step_v).max(self.floor_v);
        }
        let reading = PowerReading::new(v, self.current_ma, v * self.current_ma.abs());
        tracing::trace!(voltage = v, current_ma = self.current_ma, "simulated read");
        Ok(reading)
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub struct HardwareSensor {
    ina: ina219::Ina219,
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl HardwareSensor {
    pub fn new(bus: u8, address: u16, shunt_ohms: f64) -> error::Result<Self> {
        let ina = ina219::Ina219::new(bus, address, shunt_ohms)?;
        Ok(Self { ina })
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl PowerSensor for HardwareSensor {
    fn read(&mut self) -> Result<PowerReading, Box<dyn std::error::Error + Send + Sync>> {
        let mut attempts = 0;
        let max_attempts = 3;
        loop {
            match self.ina.read_all() {
                Ok((v, i, p)) => {
                    tracing::debug!(voltage = v, current_ma = i, "ina219 sample");
                    return Ok(PowerReading::new(v, i, p));
                }
                Err(error::HwError::Overflow) if attempts < max_attempts => {
                    attempts += 1;
                    tracing::warn!(retries = attempts, "ina219 overflow, retrying");
                }
                Err(e) => {
                    tracing::error!("INA219 read error: {}", e);
                    return Err(Box::new(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_sensor_sags_while_discharging() {
        let mut sensor = SimulatedSensor::discharging(11.0, -500.0);
        let r1 = sensor.read().unwrap();
        let r2 = sensor.read().unwrap();
        assert!(r2.voltage < r1.voltage);
        assert!((r1.power_mw - 11.0 * 500.0).abs() < 1e-9);
    }

    #[test]
    fn simulated_sensor_holds_voltage_while_charging() {
        let mut sensor = SimulatedSensor::discharging(12.0, 900.0);
        let r1 = sensor.read().unwrap();
        let r2 = sensor.read().unwrap();
        assert_eq!(r1.voltage, r2.voltage);
        assert!(r2.current_ma > 0.0);
    }

    #[test]
    fn simulated_sensor_stops_at_floor() {
        let mut sensor = SimulatedSensor::discharging(9.0005, -500.0);
        for _ in 0..5 {
            sensor.read().unwrap();
        }
        assert!(sensor.read().unwrap().voltage >= 9.0);
    }
}
