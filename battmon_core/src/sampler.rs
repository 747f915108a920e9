//! Background sensor sampling.
//!
//! Spawns a thread that owns the `PowerSensor`, reads it at a fixed period
//! and keeps only the newest reading in a bounded channel. Read failures are
//! counted and skipped; the consumer decides what a stall means.
//!
//! Each `Sampler` owns exactly one thread, joined when the `Sampler` drops.
use battmon_traits::clock::Clock;
use battmon_traits::{PowerReading, PowerSensor};
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::hw_error::map_sensor_error;

/// Longest single sleep, so drop never waits a full sample period.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

pub struct Sampler {
    rx: xch::Receiver<PowerReading>,
    errors: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    pub fn spawn<S: PowerSensor + Send + 'static, C: Clock + Send + Sync + 'static>(
        mut sensor: S,
        period: Duration,
        clock: C,
    ) -> Self {
        let (tx, rx) = xch::bounded(1);
        let stale = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let errors = Arc::new(AtomicU64::new(0));
        let errors_clone = errors.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("sampler thread received shutdown signal");
                    break;
                }

                match sensor.read() {
                    Ok(r) => {
                        // newest wins: evict an unread reading
                        let _ = stale.try_recv();
                        let _ = tx.try_send(r);
                    }
                    Err(e) => {
                        let n = errors_clone.fetch_add(1, Ordering::Relaxed) + 1;
                        let mapped = map_sensor_error(e.as_ref());
                        tracing::warn!(error = %mapped, errors = n, "sensor read failed");
                    }
                }

                let deadline = clock.now() + period;
                loop {
                    if shutdown_clone.load(Ordering::Relaxed) {
                        break;
                    }
                    let left = deadline.saturating_duration_since(clock.now());
                    if left.is_zero() {
                        break;
                    }
                    clock.sleep(left.min(SLEEP_SLICE));
                }
            }
            tracing::trace!("sampler thread exiting cleanly");
        });

        Self {
            rx,
            errors,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Newest reading not yet taken, if any.
    pub fn latest(&self) -> Option<PowerReading> {
        self.rx.try_iter().last()
    }

    /// Block up to `timeout` for the next reading.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PowerReading> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Failed reads since spawn.
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // The thread exits after the read in flight, at most one sleep slice later.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("sampler thread joined"),
                Err(e) => tracing::warn!(?e, "sampler thread panicked during shutdown"),
            }
        }
    }
}
