//! Tagged error taxonomy for user-initiated operations.
//!
//! Every lifecycle and maintenance operation returns a [`ControlResult`].
//! The error side carries one of four kinds so that callers (the chat
//! command layer) can branch on [`ErrorKind`] instead of inspecting strings:
//!
//! - **Declined**: a precondition failed and nothing was attempted
//! - **Transient**: control-channel timeouts and network errors
//! - **Process**: signalling, spawning or waiting on OS processes failed
//! - **Unexpected**: anything else, converted to a short diagnostic

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for user-initiated operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Why an operation was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclineReason {
    /// The managed process is already running.
    AlreadyRunning,
    /// The alternate route was requested but the relay binary is absent.
    RelayMissing(PathBuf),
    /// The managed process working directory does not exist.
    WorkdirMissing(PathBuf),
    /// Another lifecycle operation is still in flight.
    Busy,
    /// The log file to export does not exist.
    LogFileMissing(PathBuf),
    /// A log export matched no lines for the given level.
    NoMatchingLines(String),
    /// A terminal command outside the allow-list was requested.
    UnknownCommand(String),
    /// A command argument was rejected (e.g. a malformed host name).
    InvalidArgument(String),
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "managed process is already running"),
            Self::RelayMissing(path) => write!(f, "relay binary not found at {}", path.display()),
            Self::WorkdirMissing(path) => {
                write!(f, "working directory not found: {}", path.display())
            }
            Self::Busy => write!(f, "another lifecycle operation is in progress"),
            Self::LogFileMissing(path) => write!(f, "log file not found: {}", path.display()),
            Self::NoMatchingLines(level) => write!(f, "no log lines for level {level}"),
            Self::UnknownCommand(name) => write!(f, "unknown command: {name}"),
            Self::InvalidArgument(arg) => write!(f, "invalid argument: {arg}"),
        }
    }
}

/// Coarse classification of a [`ControlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Declined,
    Transient,
    Process,
    Unexpected,
}

/// Error returned by user-initiated operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlError {
    /// Precondition failed; reported as an informational outcome.
    #[error("Declined: {0}")]
    Declined(DeclineReason),

    /// Timeout or network failure talking to the control channel.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Failure spawning, signalling or waiting on an OS process.
    #[error("Process error: {0}")]
    Process(String),

    /// Anything else.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ControlError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Declined(_) => ErrorKind::Declined,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Process(_) => ErrorKind::Process,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// True when the operation was declined rather than failed.
    #[must_use]
    pub const fn is_declined(&self) -> bool {
        matches!(self, Self::Declined(_))
    }
}

impl From<DeclineReason> for ControlError {
    fn from(reason: DeclineReason) -> Self {
        Self::Declined(reason)
    }
}

impl From<crate::ports::ProcessError> for ControlError {
    fn from(err: crate::ports::ProcessError) -> Self {
        Self::Process(err.to_string())
    }
}

impl From<crate::ports::ChatError> for ControlError {
    fn from(err: crate::ports::ChatError) -> Self {
        if err.is_transient() {
            Self::Transient(err.to_string())
        } else {
            Self::Unexpected(err.to_string())
        }
    }
}

impl From<std::io::Error> for ControlError {
    fn from(err: std::io::Error) -> Self {
        Self::Unexpected(err.to_string())
    }
}
