//! Detached shell launcher.

use std::process::Stdio;
use std::sync::Arc;

use tokio::fs::File;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use warden_core::{LaunchSpec, ProcessError, ProcessLauncherPort};

use super::stream::{OutputSink, spawn_stream_reader};

/// Launches commands through `sh -c` in the background.
///
/// The child's stdout and stderr are drained into `tracing` (and appended
/// to the spec's output file, when set) and the child is reaped by a
/// background task, so a crashed managed process never lingers as a zombie.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLauncher;

impl ShellLauncher {
    /// Create a new launcher.
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessLauncherPort for ShellLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<u32, ProcessError> {
        debug!(command = %spec.command, workdir = %spec.workdir.display(), "Launching");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&spec.command)
            .current_dir(&spec.workdir)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProcessError::Spawn(e.to_string()))?;

        let pid = child
            .id()
            .ok_or_else(|| ProcessError::Spawn("child exited before reporting a PID".to_string()))?;

        let sink = open_sink(spec);
        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, pid, "stdout", sink.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, pid, "stderr", sink);
        }

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => info!(pid = %pid, %status, "Launched command exited"),
                Err(e) => warn!(pid = %pid, error = %e, "Failed to reap launched command"),
            }
        });

        info!(pid = %pid, "Launched managed process");
        Ok(pid)
    }
}

/// Open the output file in append mode; failures only cost the file copy.
fn open_sink(spec: &LaunchSpec) -> Option<OutputSink> {
    let path = spec.output.as_ref()?;
    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(Arc::new(Mutex::new(File::from_std(file)))),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot open output file, output only goes to logs");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_launch_runs_in_workdir_with_env() {
        let dir = tempdir().unwrap();
        let spec = LaunchSpec::new("printf %s \"$WARDEN_PROBE\" > probe.txt", dir.path())
            .with_env("WARDEN_PROBE", "hello");

        let pid = ShellLauncher::new().launch(&spec).unwrap();
        assert!(pid > 0);

        let probe = dir.path().join("probe.txt");
        for _ in 0..50 {
            if std::fs::read_to_string(&probe).is_ok_and(|s| s == "hello") {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        panic!("launched command did not write probe file");
    }

    #[tokio::test]
    async fn test_output_lands_in_file() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.log");
        let spec = LaunchSpec::new("echo hello; echo oops >&2", dir.path()).with_output(&output);

        ShellLauncher::new().launch(&spec).unwrap();

        for _ in 0..50 {
            let content = std::fs::read_to_string(&output).unwrap_or_default();
            if content.contains("hello") && content.contains("oops") {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        panic!("output file never received both streams");
    }

    #[tokio::test]
    async fn test_launch_in_missing_dir_fails() {
        let spec = LaunchSpec::new("true", "/nonexistent/warden/dir");
        let err = ShellLauncher::new().launch(&spec).unwrap_err();
        assert!(matches!(err, ProcessError::Spawn(_)));
    }
}
