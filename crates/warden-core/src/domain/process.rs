//! Process table entries and the managed-process view derived from them.

use serde::{Deserialize, Serialize};

/// One row of the OS process table, as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    /// Process ID.
    pub pid: u32,
    /// Unix timestamp (seconds) when the process was created.
    pub start_time: u64,
    /// Command-line tokens. Empty when the metadata was not readable.
    pub cmdline: Vec<String>,
}

impl ProcessEntry {
    /// Create a new process table entry.
    pub fn new(pid: u32, start_time: u64, cmdline: Vec<String>) -> Self {
        Self {
            pid,
            start_time,
            cmdline,
        }
    }

    /// Command line joined with spaces and lowercased.
    #[must_use]
    pub fn joined_cmdline(&self) -> String {
        self.cmdline.join(" ").to_lowercase()
    }
}

/// A process identified as the managed process.
///
/// Never cached: re-derived from the process table on every query so that
/// restarts performed outside warden are picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedProcess {
    /// Process ID.
    pub pid: u32,
    /// Unix timestamp (seconds) when the process was created.
    pub start_time: u64,
}

impl From<&ProcessEntry> for ManagedProcess {
    fn from(entry: &ProcessEntry) -> Self {
        Self {
            pid: entry.pid,
            start_time: entry.start_time,
        }
    }
}
