//! Process table, signal delivery and launcher ports.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ProcessEntry;

/// Errors from OS process operations.
///
/// The lifecycle controller treats these per process: a failure on one
/// member of a process set never aborts the operation on the others.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessError {
    /// The process no longer exists.
    #[error("Process {0} not found")]
    NotFound(u32),

    /// The caller may not signal or inspect the process.
    #[error("Permission denied for process {0}")]
    PermissionDenied(u32),

    /// Spawning a command failed.
    #[error("Failed to spawn: {0}")]
    Spawn(String),

    /// Delivering a signal failed for another reason.
    #[error("Failed to signal process {pid}: {reason}")]
    Signal { pid: u32, reason: String },
}

/// Termination signal flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermSignal {
    /// Cooperative termination request (SIGTERM).
    Graceful,
    /// Unconditional termination (SIGKILL).
    Forced,
}

/// Port for reading the OS process table and signalling processes.
pub trait ProcessTablePort: Send + Sync {
    /// Snapshot every process currently visible.
    ///
    /// Processes whose metadata is unreadable are returned with an empty
    /// command line; processes that vanish mid-scan are simply absent.
    fn snapshot(&self) -> Vec<ProcessEntry>;

    /// Whether the process still exists.
    fn is_alive(&self, pid: u32) -> bool;

    /// Deliver a termination signal.
    fn signal(&self, pid: u32, signal: TermSignal) -> Result<(), ProcessError>;
}

/// A shell command to launch in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Full shell command line.
    pub command: String,
    /// Working directory for the command.
    pub workdir: PathBuf,
    /// Environment overrides applied on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// File receiving the merged stdout/stderr of the command (appended).
    pub output: Option<PathBuf>,
}

impl LaunchSpec {
    /// Create a launch spec with no environment overrides.
    pub fn new(command: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            workdir: workdir.into(),
            env: Vec::new(),
            output: None,
        }
    }

    /// Add an environment override.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Append the command's output to `path`.
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }
}

/// Port for launching the managed process.
///
/// Launching is fire-and-forget: implementations return as soon as the
/// command is spawned and own the child's output streams from then on.
pub trait ProcessLauncherPort: Send + Sync {
    /// Spawn the command and return the PID of the spawned shell.
    fn launch(&self, spec: &LaunchSpec) -> Result<u32, ProcessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_spec_builder() {
        let spec = LaunchSpec::new("python -m app", "/srv/app")
            .with_env("PATH", "/usr/bin")
            .with_env("GIT_PYTHON_REFRESH", "quiet");
        assert_eq!(spec.workdir, PathBuf::from("/srv/app"));
        assert_eq!(spec.env.len(), 2);
        assert_eq!(spec.env[0], ("PATH".to_string(), "/usr/bin".to_string()));
        assert_eq!(spec.output, None);
    }
}
