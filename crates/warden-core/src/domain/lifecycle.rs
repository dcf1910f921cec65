//! Outcomes of lifecycle operations on the managed process.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::process::ManagedProcess;
use crate::error::ControlResult;

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Whether a managed process was found.
    pub running: bool,
    /// Creation time of the earliest matching process.
    pub started_at: Option<DateTime<Utc>>,
}

impl StatusReport {
    /// Report for a stopped managed process.
    #[must_use]
    pub const fn stopped() -> Self {
        Self {
            running: false,
            started_at: None,
        }
    }

    /// Report for a running managed process started at `start_time` (unix seconds).
    #[must_use]
    pub fn running_since(start_time: u64) -> Self {
        let started_at = i64::try_from(start_time)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        Self {
            running: true,
            started_at,
        }
    }

    /// Time elapsed between the process start and `now`.
    #[must_use]
    pub fn uptime_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let started_at = self.started_at?;
        (now - started_at).to_std().ok()
    }

    /// Time elapsed since the process started.
    #[must_use]
    pub fn uptime(&self) -> Option<Duration> {
        self.uptime_at(Utc::now())
    }
}

/// Result of a successful start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    /// PID of the spawned launcher shell.
    pub launcher_pid: u32,
    /// Whether the proxy relay route was used.
    pub alternate_route: bool,
    /// Whether a log tailer was (re)started for observers.
    pub tailing: bool,
}

/// How a running process set was brought down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopMode {
    /// Every process exited after the graceful signal.
    Graceful,
    /// The timeout elapsed and survivors were killed.
    Forced,
}

impl fmt::Display for StopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graceful => write!(f, "graceful"),
            Self::Forced => write!(f, "forced"),
        }
    }
}

/// Result of a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// No matching process existed; no signal was sent.
    WasNotRunning,
    /// The captured process set was stopped.
    Stopped {
        mode: StopMode,
        /// The process set captured before signalling.
        processes: Vec<ManagedProcess>,
    },
}

impl StopOutcome {
    /// The stop mode, if anything was stopped.
    #[must_use]
    pub const fn mode(&self) -> Option<StopMode> {
        match self {
            Self::WasNotRunning => None,
            Self::Stopped { mode, .. } => Some(*mode),
        }
    }
}

/// Result of a restart.
///
/// The stop phase always completes, so its outcome is reported even when
/// the start that follows fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartReport {
    pub stop: StopOutcome,
    pub start: ControlResult<StartReport>,
}
