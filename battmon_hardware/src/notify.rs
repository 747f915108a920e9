//! Notification backends for low-battery warnings.

use battmon_traits::{Notifier, Urgency};
use std::process::Command;

use crate::error::HwError;

/// Desktop notifications through `notify-send` (mako, dunst, ...).
#[derive(Debug, Clone)]
pub struct NotifySend {
    program: String,
}

impl NotifySend {
    pub fn new() -> Self {
        Self {
            program: "notify-send".to_string(),
        }
    }

    /// Use a different binary with the same CLI (tests, wrappers).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for NotifySend {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotifySend {
    fn notify(
        &self,
        urgency: Urgency,
        title: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let out = Command::new(&self.program)
            .arg("-u")
            .arg(urgency.as_str())
            .arg(title)
            .arg(body)
            .output()
            .map_err(HwError::from)?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(Box::new(HwError::Notify(format!(
                "{} exited with {}: {}",
                self.program,
                out.status,
                stderr.trim()
            ))));
        }
        Ok(())
    }
}

/// Headless hosts: route warnings into the log instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(
        &self,
        urgency: Urgency,
        title: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match urgency {
            Urgency::Critical => tracing::error!(title, body, "battery warning"),
            Urgency::Normal => tracing::warn!(title, body, "battery warning"),
            Urgency::Low => tracing::info!(title, body, "battery warning"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_an_error_not_a_panic() {
        let n = NotifySend::with_program("/nonexistent/battmon-notify");
        assert!(n.notify(Urgency::Normal, "t", "b").is_err());
    }

    #[test]
    fn log_notifier_always_succeeds() {
        assert!(LogNotifier.notify(Urgency::Critical, "t", "b").is_ok());
    }
}
