//! Identification of managed processes by command-line markers.

use std::sync::Arc;

use warden_core::{ManagedProcess, ProcessEntry, ProcessTablePort, StatusReport};

/// Finds the managed process in the OS process table.
///
/// A process matches when its command line, joined with spaces and
/// lowercased, contains every marker. Entries with an unreadable (empty)
/// command line never match.
pub struct ProcessMatcher {
    table: Arc<dyn ProcessTablePort>,
    markers: Vec<String>,
}

impl ProcessMatcher {
    /// Create a matcher over `table` requiring all of `markers`.
    pub fn new(table: Arc<dyn ProcessTablePort>, markers: Vec<String>) -> Self {
        let markers = markers.into_iter().map(|m| m.to_lowercase()).collect();
        Self { table, markers }
    }

    /// The underlying process table.
    pub fn table(&self) -> &Arc<dyn ProcessTablePort> {
        &self.table
    }

    /// Whether a single entry matches every marker.
    pub fn matches(&self, entry: &ProcessEntry) -> bool {
        if entry.cmdline.is_empty() {
            return false;
        }
        let joined = entry.joined_cmdline();
        self.markers.iter().all(|marker| joined.contains(marker.as_str()))
    }

    /// All managed processes, earliest first. Never fails.
    pub fn find_managed_processes(&self) -> Vec<ManagedProcess> {
        // Our own command line may carry the markers as flag values
        let own_pid = std::process::id();
        let mut found: Vec<ManagedProcess> = self
            .table
            .snapshot()
            .iter()
            .filter(|entry| entry.pid != own_pid && self.matches(entry))
            .map(ManagedProcess::from)
            .collect();
        found.sort_by_key(|p| (p.start_time, p.pid));
        found
    }

    /// Whether the managed process runs, with the earliest start time.
    pub fn is_running(&self) -> StatusReport {
        match self.find_managed_processes().first() {
            Some(process) => StatusReport::running_since(process.start_time),
            None => StatusReport::stopped(),
        }
    }
}
