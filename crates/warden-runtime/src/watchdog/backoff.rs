//! Exponential reconnect delays.

use std::time::Duration;

use warden_core::Settings;

/// `base * multiplier^(attempt - 1)`, capped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub multiplier: f64,
    pub cap: Duration,
}

impl Backoff {
    pub const fn new(base: Duration, multiplier: f64, cap: Duration) -> Self {
        Self {
            base,
            multiplier,
            cap,
        }
    }

    pub const fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.backoff_base,
            settings.backoff_multiplier,
            settings.backoff_cap,
        )
    }

    /// Delay before the given (1-based) attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.cap.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
