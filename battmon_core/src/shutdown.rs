//! Consecutive-low detector for the safe-shutdown watchdog.
//!
//! A single low reading can be a load spike; the pack has to read low on
//! several checks in a row before the host is powered off.

use crate::config::ShutdownCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownDecision {
    Ok,
    /// Back above the thresholds after one or more low checks.
    Recovered,
    /// `warn` is set on the first low check of a run when warnings are enabled.
    Low { count: u32, warn: bool },
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ShutdownPolicy {
    cfg: ShutdownCfg,
    low_count: u32,
    warned: bool,
}

impl ShutdownPolicy {
    pub fn new(cfg: ShutdownCfg) -> Self {
        Self {
            cfg,
            low_count: 0,
            warned: false,
        }
    }

    pub fn cfg(&self) -> &ShutdownCfg {
        &self.cfg
    }

    pub fn low_count(&self) -> u32 {
        self.low_count
    }

    pub fn check(&mut self, voltage: f64, percent: f64, charging: bool) -> ShutdownDecision {
        if charging {
            self.reset();
            return ShutdownDecision::Ok;
        }
        if voltage <= self.cfg.voltage || percent <= self.cfg.percent {
            self.low_count += 1;
            if self.low_count >= self.cfg.consecutive_low {
                return ShutdownDecision::Shutdown;
            }
            let warn = self.low_count == 1 && self.cfg.warn_before && !self.warned;
            if warn {
                self.warned = true;
            }
            return ShutdownDecision::Low {
                count: self.low_count,
                warn,
            };
        }
        let was_low = self.low_count > 0;
        self.reset();
        if was_low {
            ShutdownDecision::Recovered
        } else {
            ShutdownDecision::Ok
        }
    }

    fn reset(&mut self) {
        self.low_count = 0;
        self.warned = false;
    }
}
