//! Test and helper mocks for battmon_core.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use battmon_traits::{Notifier, PowerReading, PowerSensor, Urgency};

/// A sensor that always errors on read.
pub struct NoopSensor;

impl PowerSensor for NoopSensor {
    fn read(&mut self) -> Result<PowerReading, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop sensor")))
    }
}

/// Replays a fixed sequence, then repeats the last reading.
pub struct SeqSensor {
    readings: VecDeque<PowerReading>,
    last: Option<PowerReading>,
}

impl SeqSensor {
    pub fn new(readings: impl IntoIterator<Item = PowerReading>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            last: None,
        }
    }
}

impl PowerSensor for SeqSensor {
    fn read(&mut self) -> Result<PowerReading, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(r) = self.readings.pop_front() {
            self.last = Some(r);
        }
        self.last.ok_or_else(|| "empty sequence".into())
    }
}

/// Collects notifications; clones share the list.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(Urgency, String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Urgency, String, String)> {
        match self.sent.lock() {
            Ok(g) => g.clone(),
            Err(p) => p.into_inner().clone(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        urgency: Urgency,
        title: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let entry = (urgency, title.to_string(), body.to_string());
        match self.sent.lock() {
            Ok(mut g) => g.push(entry),
            Err(p) => p.into_inner().push(entry),
        }
        Ok(())
    }
}
