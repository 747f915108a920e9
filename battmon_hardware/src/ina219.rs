use rppal::i2c::I2c;
use tracing::trace;

use crate::error::{HwError, Result};

const REG_CONFIG: u8 = 0x00;
const REG_SHUNT_VOLTAGE: u8 = 0x01;
const REG_BUS_VOLTAGE: u8 = 0x02;

/// 32 V bus range, ±320 mV shunt range, 12-bit conversions, continuous.
const CONFIG_32V_320MV: u16 = 0x399F;

/// Bus voltage LSB is 4 mV once the three status bits are shifted out.
const BUS_LSB_V: f64 = 0.004;
/// Shunt voltage LSB is 10 µV.
const SHUNT_LSB_MV: f64 = 0.01;

pub struct Ina219 {
    i2c: I2c,
    shunt_ohms: f64,
}

impl Ina219 {
    pub fn new(bus: u8, address: u16, shunt_ohms: f64) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(format!("open bus {bus}: {e}")))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(format!("address 0x{address:02x}: {e}")))?;
        let mut dev = Self { i2c, shunt_ohms };
        dev.write_register(REG_CONFIG, CONFIG_32V_320MV)?;
        Ok(dev)
    }

    fn write_register(&mut self, reg: u8, value: u16) -> Result<()> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(&[reg, hi, lo])
            .map(|_| ())
            .map_err(|e| HwError::I2c(format!("write reg 0x{reg:02x}: {e}")))
    }

    fn read_register(&mut self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(&[reg], &mut buf)
            .map_err(|e| HwError::I2c(format!("read reg 0x{reg:02x}: {e}")))?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Bus voltage in volts.
    pub fn voltage(&mut self) -> Result<f64> {
        let raw = self.read_register(REG_BUS_VOLTAGE)?;
        // Bit 0 (OVF) set means the power/current math overflowed.
        if raw & 0x0001 != 0 {
            return Err(HwError::Overflow);
        }
        Ok(f64::from(raw >> 3) * BUS_LSB_V)
    }

    /// Shunt current in mA; positive when current flows into the pack.
    pub fn current_ma(&mut self) -> Result<f64> {
        let raw = self.read_register(REG_SHUNT_VOLTAGE)? as i16;
        let shunt_mv = f64::from(raw) * SHUNT_LSB_MV;
        Ok(shunt_mv / self.shunt_ohms)
    }

    /// Read voltage, current and power (mW) as one sample.
    pub fn read_all(&mut self) -> Result<(f64, f64, f64)> {
        let v = self.voltage()?;
        let i = self.current_ma()?;
        let p = v * i.abs();
        trace!(voltage = v, current_ma = i, power_mw = p, "ina219 read");
        Ok((v, i, p))
    }
}
