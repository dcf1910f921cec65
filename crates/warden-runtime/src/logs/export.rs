//! Level-filtered export of the static log file.

use std::io;
use std::path::Path;

use regex::RegexBuilder;
use tracing::debug;
use warden_core::{ControlError, ControlResult, DeclineReason};

/// Level token that bypasses filtering.
pub const ALL_LEVELS: &str = "ALL";

/// An export ready to be sent as a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExport {
    /// Upper-cased level the export was filtered by.
    pub level: String,
    /// Suggested attachment name, `logs-<LEVEL>.txt`.
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Export lines of `path` containing `level` as a whole word (case-insensitive).
///
/// `ALL` returns the file verbatim. A missing file or an empty result is
/// declined rather than failed.
pub async fn export_logs(path: &Path, level: &str) -> ControlResult<LogExport> {
    let level = level.trim().to_uppercase();
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DeclineReason::LogFileMissing(path.to_path_buf()).into());
        }
        Err(e) => return Err(e.into()),
    };

    let content = if level == ALL_LEVELS {
        raw
    } else {
        filter_level(&String::from_utf8_lossy(&raw), &level)?.into_bytes()
    };
    debug!(path = %path.display(), %level, bytes = content.len(), "Log export prepared");

    if content.is_empty() {
        return Err(DeclineReason::NoMatchingLines(level).into());
    }

    Ok(LogExport {
        file_name: format!("logs-{level}.txt"),
        level,
        content,
    })
}

fn filter_level(text: &str, level: &str) -> ControlResult<String> {
    let pattern = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(level)))
        .case_insensitive(true)
        .build()
        .map_err(|e| ControlError::Unexpected(e.to_string()))?;

    Ok(text
        .split_inclusive('\n')
        .filter(|line| pattern.is_match(line))
        .collect())
}
