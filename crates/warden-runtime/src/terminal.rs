//! Allow-listed shell commands, maintenance installs and ping.
//!
//! Nothing here runs arbitrary input: terminal commands come from a fixed
//! allow-list and the ping host is validated and passed as an argument,
//! never through the shell.

use std::fmt;
use std::process::Stdio;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info, warn};
use warden_core::{ControlError, ControlResult, DeclineReason, Settings};

use crate::config::TargetConfig;
use crate::text::truncate_chars;

/// Marker appended to truncated command output.
const OUTPUT_TRUNCATED: &str = "\n... (output truncated)";

/// Output lines quoted when a maintenance command fails.
const FAILURE_TAIL_LINES: usize = 10;

/// pip installs can take a while on small hosts.
const MAINTENANCE_TIMEOUT: Duration = Duration::from_secs(600);

/// One round trip in `ping` output, e.g. `time=10.2 ms`.
static PING_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=(\d+\.?\d*) ms").expect("ping time pattern is valid"));

/// Host pinged when none is given.
pub const DEFAULT_PING_HOST: &str = "open.spotify.com";

/// The allow-listed terminal commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalCommand {
    /// Memory usage.
    Free,
    /// One batch iteration of `top`.
    Top,
    /// Listing of the managed-process working directory.
    Ls,
    /// Interpreter processes.
    Ps,
    /// Outdated packages of the interpreter.
    Outdated,
    /// Purge the pip cache.
    Purge,
}

impl TerminalCommand {
    pub const ALL: [Self; 6] = [
        Self::Free,
        Self::Top,
        Self::Ls,
        Self::Ps,
        Self::Outdated,
        Self::Purge,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Top => "top",
            Self::Ls => "ls",
            Self::Ps => "ps",
            Self::Outdated => "outdated",
            Self::Purge => "purge",
        }
    }

    /// Shell command line for this entry.
    pub fn shell_command(self, target: &TargetConfig) -> String {
        let python = target.python.display();
        match self {
            Self::Free => "free -h".to_string(),
            Self::Top => "top -bn1".to_string(),
            Self::Ls => "ls -la".to_string(),
            Self::Ps => format!("ps aux | grep -i {}", target.interpreter_marker),
            Self::Outdated => format!("{python} -m pip list --outdated"),
            Self::Purge => format!("{python} -m pip cache purge"),
        }
    }
}

impl fmt::Display for TerminalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TerminalCommand {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name() == name)
            .ok_or_else(|| DeclineReason::UnknownCommand(s.trim().to_string()).into())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr, truncated for chat delivery.
    pub text: String,
}

/// Outcome of a ping.
#[derive(Debug, Clone, PartialEq)]
pub struct PingReport {
    pub host: String,
    pub reachable: bool,
    pub average_ms: Option<f64>,
}

impl fmt::Display for PingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.reachable, self.average_ms) {
            (true, Some(avg)) => write!(f, "{} is reachable\nAverage time: {avg:.1} ms", self.host),
            (true, None) => write!(f, "{} is reachable", self.host),
            (false, _) => write!(f, "{} is unreachable", self.host),
        }
    }
}

/// Runs bounded commands on behalf of operators.
pub struct TerminalRunner {
    target: TargetConfig,
    timeout: Duration,
    max_chars: usize,
}

impl TerminalRunner {
    pub fn new(target: TargetConfig, settings: &Settings) -> Self {
        Self {
            target,
            timeout: settings.terminal_timeout,
            max_chars: settings.max_message_chars,
        }
    }

    /// Run an allow-listed command in the managed-process working directory.
    ///
    /// `ls` lists that directory, so it is declined when the directory is
    /// missing.
    pub async fn run(&self, command: TerminalCommand) -> ControlResult<CommandOutput> {
        if command == TerminalCommand::Ls {
            self.ensure_workdir()?;
        }
        info!(%command, "Running terminal command");
        let raw = self
            .run_shell(&command.shell_command(&self.target), self.timeout)
            .await?;
        Ok(self.finish(raw, false))
    }

    /// `pip install -r requirements.txt` in the working directory.
    pub async fn install_requirements(&self) -> ControlResult<CommandOutput> {
        self.ensure_workdir()?;
        let command = format!(
            "{} -m pip install -r requirements.txt",
            self.target.python.display()
        );
        info!("Installing requirements");
        let raw = self.run_shell(&command, MAINTENANCE_TIMEOUT).await?;
        Ok(self.finish(raw, true))
    }

    /// Upgrade the managed package.
    pub async fn update_package(&self) -> ControlResult<CommandOutput> {
        let command = format!(
            "{} -m pip install {} -U",
            self.target.python.display(),
            self.target.package
        );
        info!(package = %self.target.package, "Updating package");
        let raw = self.run_shell(&command, MAINTENANCE_TIMEOUT).await?;
        Ok(self.finish(raw, true))
    }

    /// Three ICMP echoes to `host`, averaging the reported round trips.
    pub async fn ping(&self, host: &str) -> ControlResult<PingReport> {
        let host = host.trim();
        let host = if host.is_empty() { DEFAULT_PING_HOST } else { host };
        if !is_plain_host(host) {
            return Err(DeclineReason::InvalidArgument(host.to_string()).into());
        }

        let mut cmd = Command::new("ping");
        cmd.args(["-c", "3", host]);
        let raw = self.execute(cmd, self.timeout).await?;

        let times = parse_ping_times(&raw.stdout);
        #[allow(clippy::cast_precision_loss)]
        let average_ms =
            (!times.is_empty()).then(|| times.iter().sum::<f64>() / times.len() as f64);

        Ok(PingReport {
            host: host.to_string(),
            reachable: raw.success,
            average_ms: average_ms.filter(|_| raw.success),
        })
    }

    fn ensure_workdir(&self) -> ControlResult<()> {
        if self.target.workdir().is_dir() {
            Ok(())
        } else {
            Err(DeclineReason::WorkdirMissing(self.target.workdir.clone()).into())
        }
    }

    async fn run_shell(&self, command: &str, timeout: Duration) -> ControlResult<RawOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        if self.target.workdir().is_dir() {
            cmd.current_dir(self.target.workdir());
        }
        self.execute(cmd, timeout).await
    }

    async fn execute(&self, mut cmd: Command, timeout: Duration) -> ControlResult<RawOutput> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ControlError::Process(format!("failed to run command: {e}"))),
            Err(_) => {
                warn!(timeout = ?timeout, "Command timed out");
                return Err(ControlError::Process(format!(
                    "command timed out after {}s",
                    timeout.as_secs()
                )));
            }
        };

        debug!(status = %output.status, "Command finished");
        Ok(RawOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn finish(&self, raw: RawOutput, tail_on_failure: bool) -> CommandOutput {
        let combined = format!("{}{}", raw.stdout, raw.stderr);
        let text = if combined.trim().is_empty() {
            "(no output)".to_string()
        } else if tail_on_failure && !raw.success {
            last_lines(&combined, FAILURE_TAIL_LINES)
        } else {
            truncate_chars(&combined, self.max_chars, OUTPUT_TRUNCATED)
        };
        CommandOutput {
            success: raw.success,
            exit_code: raw.exit_code,
            text,
        }
    }
}

struct RawOutput {
    success: bool,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

/// Round-trip times (ms) reported by `ping`.
pub fn parse_ping_times(output: &str) -> Vec<f64> {
    PING_TIME
        .captures_iter(output)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

/// Host names and IP literals only; nothing `ping` could read as an option.
fn is_plain_host(host: &str) -> bool {
    !host.starts_with('-')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'))
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}
