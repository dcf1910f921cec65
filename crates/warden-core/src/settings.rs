//! Timing and size settings for the runtime components.
//!
//! These are pure values with the production defaults; the CLI overrides a
//! few of them from flags and `validate_settings` rejects nonsensical values.

use std::time::Duration;

/// Default wait between spawning the managed process and confirming it runs.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Default stop timeout before escalating to a forced kill.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(15);

/// Default stop timeout used by restart.
pub const DEFAULT_RESTART_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum characters in one outbound chat message.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Wait after spawn before re-checking liveness.
    pub settle_delay: Duration,
    /// Interval between liveness polls while stopping.
    pub stop_poll_interval: Duration,
    /// Default stop timeout.
    pub stop_timeout: Duration,
    /// Stop timeout used by restart.
    pub restart_stop_timeout: Duration,

    /// How long the tailer waits for the log file to appear.
    pub tail_wait: Duration,
    /// Poll interval while waiting for the log file.
    pub tail_wait_poll: Duration,
    /// Pause between read passes while the managed process is alive.
    pub tail_interval: Duration,
    /// Pause after a failed read pass.
    pub tail_error_backoff: Duration,

    /// Buffered line count that triggers an immediate flush.
    pub flush_threshold: usize,
    /// Delay after the first unflushed line before an idle flush.
    pub flush_delay: Duration,
    /// Maximum characters per flushed message.
    pub max_message_chars: usize,

    /// Interval between control-channel probes.
    pub probe_interval: Duration,
    /// Timeout for a single probe.
    pub probe_timeout: Duration,
    /// Consecutive probe failures that trigger a supervised restart.
    pub failure_threshold: u32,

    /// First reconnect delay of the polling supervisor.
    pub backoff_base: Duration,
    /// Growth factor between reconnect delays.
    pub backoff_multiplier: f64,
    /// Upper bound for a single reconnect delay.
    pub backoff_cap: Duration,
    /// Retry budget of the polling supervisor (`None` = never give up).
    pub max_retries: Option<u32>,

    /// Timeout for allow-listed terminal commands.
    pub terminal_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            stop_poll_interval: Duration::from_secs(2),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            restart_stop_timeout: DEFAULT_RESTART_STOP_TIMEOUT,
            tail_wait: Duration::from_secs(30),
            tail_wait_poll: Duration::from_secs(1),
            tail_interval: Duration::from_secs(2),
            tail_error_backoff: Duration::from_secs(5),
            flush_threshold: 10,
            flush_delay: Duration::from_secs(4),
            max_message_chars: MAX_MESSAGE_CHARS,
            probe_interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
            failure_threshold: 3,
            backoff_base: Duration::from_secs(5),
            backoff_multiplier: 1.5,
            backoff_cap: Duration::from_secs(300),
            max_retries: None,
            terminal_timeout: Duration::from_secs(30),
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Flush threshold must be at least 1")]
    ZeroFlushThreshold,

    #[error("Max message size must be at least 16 characters, got {0}")]
    MessageTooSmall(usize),

    #[error("Failure threshold must be at least 1")]
    ZeroFailureThreshold,

    #[error("Backoff multiplier must be >= 1.0")]
    InvalidBackoffMultiplier,

    #[error("Backoff cap must not be smaller than the base delay")]
    BackoffCapBelowBase,
}

/// Validate settings.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    let durations = [
        ("stop_poll_interval", settings.stop_poll_interval),
        ("tail_wait_poll", settings.tail_wait_poll),
        ("tail_interval", settings.tail_interval),
        ("flush_delay", settings.flush_delay),
        ("probe_interval", settings.probe_interval),
        ("probe_timeout", settings.probe_timeout),
        ("backoff_base", settings.backoff_base),
        ("terminal_timeout", settings.terminal_timeout),
    ];
    for (name, value) in durations {
        if value.is_zero() {
            return Err(SettingsError::ZeroDuration(name));
        }
    }

    if settings.flush_threshold == 0 {
        return Err(SettingsError::ZeroFlushThreshold);
    }
    if settings.max_message_chars < 16 {
        return Err(SettingsError::MessageTooSmall(settings.max_message_chars));
    }
    if settings.failure_threshold == 0 {
        return Err(SettingsError::ZeroFailureThreshold);
    }
    if settings.backoff_multiplier.is_nan() || settings.backoff_multiplier < 1.0 {
        return Err(SettingsError::InvalidBackoffMultiplier);
    }
    if settings.backoff_cap < settings.backoff_base {
        return Err(SettingsError::BackoffCapBelowBase);
    }

    Ok(())
}
