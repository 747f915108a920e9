//! Safe-shutdown daemon: single instance via a PID file, consecutive-low
//! checks, and a clean poweroff.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use battmon_core::runner::sample_once;
use battmon_core::{Estimator, ShutdownDecision, ShutdownPolicy};
use battmon_traits::{Notifier, PowerSensor, Urgency};
use eyre::WrapErr;

const SLEEP_SLICE: Duration = Duration::from_millis(250);
/// Give the notification daemon a moment before the session goes away.
const NOTIFY_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct WatchdogOpts {
    pub interval: Duration,
    pub dry_run: bool,
    pub max_checks: Option<u64>,
    pub pid_file: PathBuf,
}

/// Removes the PID file when the daemon exits by any path.
#[derive(Debug)]
pub struct PidGuard {
    path: PathBuf,
}

impl PidGuard {
    /// Claim `path` for this process. Fails if a live process already owns
    /// it; a stale file is removed first.
    pub fn acquire(path: &Path) -> eyre::Result<Self> {
        if let Some(pid) = read_pid(path) {
            if process_alive(pid) {
                eyre::bail!("battery watchdog already running (PID {pid})");
            }
            tracing::info!(pid, path = %path.display(), "removing stale PID file");
        }
        if path.exists() {
            let _ = fs::remove_file(path);
        }
        fs::write(path, std::process::id().to_string())
            .wrap_err_with(|| format!("write PID file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::debug!(error = %e, "PID file already gone");
        }
    }
}

fn read_pid(path: &Path) -> Option<i32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    // Signal 0 only checks for existence.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn process_alive(_pid: i32) -> bool {
    false
}

/// Check the pack every `opts.interval` until shutdown, a stop request, or
/// `max_checks`. Returns the number of checks made.
pub fn run(
    estimator: &Estimator,
    sensor: &mut dyn PowerSensor,
    notifier: &dyn Notifier,
    mut policy: ShutdownPolicy,
    opts: &WatchdogOpts,
    stop: &AtomicBool,
) -> eyre::Result<u64> {
    let cfg = policy.cfg().clone();
    tracing::info!(
        pid = std::process::id(),
        voltage = cfg.voltage,
        percent = cfg.percent,
        consecutive = cfg.consecutive_low,
        "battery watchdog started"
    );

    let mut checks = 0u64;
    while !stop.load(Ordering::Relaxed) {
        if opts.max_checks.is_some_and(|m| checks >= m) {
            break;
        }
        checks += 1;

        match sample_once(sensor, estimator) {
            Ok((r, percent)) => {
                match policy.check(r.voltage, percent, estimator.is_charging()) {
                    ShutdownDecision::Ok => {}
                    ShutdownDecision::Recovered => {
                        tracing::info!(voltage = r.voltage, percent, "battery recovered");
                    }
                    ShutdownDecision::Low { count, warn } => {
                        tracing::warn!(
                            voltage = r.voltage,
                            percent,
                            count,
                            of = cfg.consecutive_low,
                            "low battery detected"
                        );
                        if warn {
                            let eta = u64::from(cfg.consecutive_low) * opts.interval.as_secs();
                            send(
                                notifier,
                                "CRITICAL BATTERY",
                                &format!("Battery at {percent:.0}%! Shutdown in ~{eta}s"),
                            );
                        }
                    }
                    ShutdownDecision::Shutdown => {
                        tracing::error!(voltage = r.voltage, percent, "initiating safe shutdown");
                        send(
                            notifier,
                            "SHUTTING DOWN",
                            "Battery critically low. System shutting down now.",
                        );
                        estimator.close();
                        if opts.dry_run {
                            println!("dry run: would power off now");
                        } else {
                            std::thread::sleep(NOTIFY_GRACE);
                            power_off();
                        }
                        return Ok(checks);
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "watchdog read failed"),
        }

        sleep_unless_stopped(opts.interval, stop);
    }

    estimator.close();
    Ok(checks)
}

fn send(notifier: &dyn Notifier, title: &str, body: &str) {
    if let Err(e) = notifier.notify(Urgency::Critical, title, body) {
        tracing::warn!(error = %e, title, "shutdown notification failed");
    }
}

fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let mut left = total;
    while !left.is_zero() && !stop.load(Ordering::Relaxed) {
        let step = left.min(SLEEP_SLICE);
        std::thread::sleep(step);
        left = left.saturating_sub(step);
    }
}

fn run_cmd(program: &str, args: &[&str]) -> bool {
    match Command::new(program).args(args).status() {
        Ok(s) if s.success() => true,
        Ok(s) => {
            tracing::warn!(program, status = %s, "command failed");
            false
        }
        Err(e) => {
            tracing::warn!(program, error = %e, "command could not start");
            false
        }
    }
}

fn power_off() {
    run_cmd("sync", &[]);
    if !run_cmd("systemctl", &["poweroff"]) {
        run_cmd("sudo", &["poweroff"]);
    }
}
