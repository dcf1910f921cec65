//! One-shot health report of the managed-process setup.

use std::fmt;
use std::path::{Path, PathBuf};

use warden_core::StatusReport;

use crate::config::TargetConfig;
use crate::process::LifecycleController;
use crate::text::format_duration;

/// Lines of the tail file quoted in the report.
const LAST_LINES: usize = 5;

/// Result of [`diagnose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    /// Resolved interpreter path, if it could be found.
    pub interpreter: Option<PathBuf>,
    pub workdir_found: bool,
    pub status: StatusReport,
    /// Size of the tail file in bytes, if it exists.
    pub tail_file_size: Option<u64>,
    pub last_lines: Vec<String>,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.interpreter {
            Some(path) => writeln!(f, "[ok] interpreter found: {}", path.display())?,
            None => writeln!(f, "[!!] interpreter not found")?,
        }
        if self.workdir_found {
            writeln!(f, "[ok] working directory found")?;
        } else {
            writeln!(f, "[!!] working directory not found")?;
        }
        match (self.status.running, self.status.uptime()) {
            (true, Some(uptime)) => writeln!(f, "[ok] running (uptime {})", format_duration(uptime))?,
            (true, None) => writeln!(f, "[ok] running")?,
            (false, _) => writeln!(f, "[!!] not running")?,
        }
        match self.tail_file_size {
            Some(size) => write!(f, "[ok] output log exists ({size} bytes)")?,
            None => write!(f, "[!!] output log does not exist")?,
        }
        if !self.last_lines.is_empty() {
            write!(f, "\nLast output:")?;
            for line in &self.last_lines {
                write!(f, "\n  {line}")?;
            }
        }
        Ok(())
    }
}

/// Collect diagnostics for the controller's target.
pub async fn diagnose(controller: &LifecycleController) -> Diagnostics {
    let target = controller.target();
    let status = controller.status();
    let (tail_file_size, last_lines) = read_tail(&target.tail_file).await;

    Diagnostics {
        interpreter: resolve_interpreter(target),
        workdir_found: target.workdir().is_dir(),
        status,
        tail_file_size,
        last_lines,
    }
}

/// Find the interpreter: as given when it has a directory part, otherwise
/// on the managed process PATH and then on our own.
pub fn resolve_interpreter(target: &TargetConfig) -> Option<PathBuf> {
    let python = &target.python;
    if python.components().count() > 1 {
        return python.is_file().then(|| python.clone());
    }

    let own_path = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&target.path_override)
        .chain(std::env::split_paths(&own_path))
        .map(|dir| dir.join(python))
        .find(|candidate| candidate.is_file())
}

async fn read_tail(path: &Path) -> (Option<u64>, Vec<String>) {
    let Ok(raw) = tokio::fs::read(path).await else {
        return (None, Vec::new());
    };
    let text = String::from_utf8_lossy(&raw);
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect();
    let keep = lines.len().saturating_sub(LAST_LINES);
    (Some(raw.len() as u64), lines[keep..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{DebugBroadcaster, ObserverRegistry};
    use crate::process::{ProcessMatcher, ShellLauncher};
    use crate::test_support::{FakeTable, RecordingSender};
    use std::sync::Arc;
    use tempfile::tempdir;
    use warden_core::Settings;

    fn controller(target: TargetConfig, table: Arc<FakeTable>) -> LifecycleController {
        let settings = Settings::default();
        let broadcaster = Arc::new(DebugBroadcaster::new(
            Arc::new(RecordingSender::new()),
            Arc::new(ObserverRegistry::new()),
            &settings,
        ));
        LifecycleController::new(
            Arc::new(ProcessMatcher::new(table, target.markers())),
            Arc::new(ShellLauncher::new()),
            target,
            settings,
            broadcaster,
        )
    }

    #[tokio::test]
    async fn test_diagnose_reports_tail_and_status() {
        let dir = tempdir().unwrap();
        let python = dir.path().join("python3");
        std::fs::write(&python, "").unwrap();
        let target = TargetConfig::new(dir.path()).with_python(&python);
        let lines: String = (1..=8).map(|i| format!("line {i}\n")).collect();
        std::fs::write(&target.tail_file, &lines).unwrap();

        let table = Arc::new(FakeTable::new());
        table.add(42, 1_700_000_000, &["python3", "-m", "heroku", "--no-web"], None);

        let report = diagnose(&controller(target, table)).await;

        assert_eq!(report.interpreter, Some(python));
        assert!(report.workdir_found);
        assert!(report.status.running);
        assert_eq!(report.tail_file_size, Some(lines.len() as u64));
        assert_eq!(report.last_lines, vec!["line 4", "line 5", "line 6", "line 7", "line 8"]);

        let text = report.to_string();
        assert!(text.contains("[ok] running"));
        assert!(text.ends_with("  line 8"));
    }

    #[tokio::test]
    async fn test_diagnose_missing_everything() {
        let target = TargetConfig::new("/nonexistent/warden").with_python("/nonexistent/python3");
        let report = diagnose(&controller(target, Arc::new(FakeTable::new()))).await;

        assert_eq!(report.interpreter, None);
        assert!(!report.workdir_found);
        assert!(!report.status.running);
        assert_eq!(report.tail_file_size, None);
        assert!(report.to_string().contains("[!!] output log does not exist"));
    }
}
