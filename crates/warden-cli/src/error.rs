//! CLI-specific error types and exit codes.

use thiserror::Error;
use warden_core::{PathError, SettingsError};
use warden_runtime::SupervisorError;
use warden_runtime::state::StateError;
use warden_telegram::TelegramError;

/// Errors that end the supervisor.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument validation error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (state file, working directory).
    #[error("IO error: {0}")]
    Io(String),

    /// The control channel could not be established.
    #[error("Control channel error: {0}")]
    Channel(String),
}

impl CliError {
    /// Map error to a process exit code (see sysexits.h).
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Io(_) => 74,       // EX_IOERR
            Self::Channel(_) => 69,  // EX_UNAVAILABLE
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<StateError> for CliError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Io(e) => Self::Io(e.to_string()),
            StateError::Json(e) => Self::Config(format!("state file is not valid JSON: {e}")),
        }
    }
}

impl From<TelegramError> for CliError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::InvalidUrl(e) => Self::Config(format!("invalid Bot API URL: {e}")),
            other => Self::Channel(other.to_string()),
        }
    }
}

impl From<SupervisorError> for CliError {
    fn from(err: SupervisorError) -> Self {
        Self::Channel(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
