//! Background task streaming the managed process output to observers.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use warden_core::Settings;

use super::cursor::LogCursor;
use crate::broadcast::DebugBroadcaster;
use crate::process::ProcessMatcher;

/// Why a tailer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailerExit {
    /// The file never showed up within the wait window.
    NeverAppeared,
    /// The file vanished while tailing.
    FileRemoved,
    /// The managed process is no longer running.
    ProcessExited,
}

impl TailerExit {
    /// Marker sent to observers when the tailer stops.
    pub const fn marker(self) -> &'static str {
        match self {
            Self::NeverAppeared => "Log file did not appear, log stream not started",
            Self::FileRemoved => "Log file was removed, log stream stopped",
            Self::ProcessExited => "Managed process exited, log stream finished",
        }
    }
}

/// Follows one log file for one managed-process lifetime.
pub struct LogTailer {
    cursor: LogCursor,
    matcher: Arc<ProcessMatcher>,
    broadcaster: Arc<DebugBroadcaster>,
    wait: Duration,
    wait_poll: Duration,
    interval: Duration,
    error_backoff: Duration,
}

impl LogTailer {
    pub fn new(
        cursor: LogCursor,
        matcher: Arc<ProcessMatcher>,
        broadcaster: Arc<DebugBroadcaster>,
        settings: &Settings,
    ) -> Self {
        Self {
            cursor,
            matcher,
            broadcaster,
            wait: settings.tail_wait,
            wait_poll: settings.tail_wait_poll,
            interval: settings.tail_interval,
            error_backoff: settings.tail_error_backoff,
        }
    }

    /// Tail until the file disappears or the managed process exits.
    ///
    /// Never fails: read errors are logged and retried after a pause.
    pub async fn run(mut self) -> TailerExit {
        let path = self.cursor.path().to_path_buf();
        info!(path = %path.display(), "Log tailer started");

        let exit = if self.wait_for_file().await {
            self.follow().await
        } else {
            TailerExit::NeverAppeared
        };

        info!(path = %path.display(), ?exit, "Log tailer finished");
        self.broadcaster.announce(exit.marker()).await;
        exit
    }

    async fn wait_for_file(&self) -> bool {
        let deadline = tokio::time::Instant::now() + self.wait;
        loop {
            if tokio::fs::try_exists(self.cursor.path()).await.unwrap_or(false) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.wait_poll).await;
        }
    }

    /// Forward whatever the exited process left, including a last line
    /// without a newline.
    async fn drain_rest(&mut self) {
        match self.cursor.read_rest().await {
            Ok(lines) => {
                for line in lines {
                    self.broadcaster.push(line).await;
                }
            }
            Err(e) => debug!(error = %e, "Final log read failed"),
        }
    }

    async fn follow(&mut self) -> TailerExit {
        loop {
            match self.cursor.read_new().await {
                Ok(lines) => {
                    if !lines.is_empty() {
                        debug!(count = lines.len(), offset = self.cursor.offset(), "Read log lines");
                    }
                    for line in lines {
                        self.broadcaster.push(line).await;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(path = %self.cursor.path().display(), "Log file disappeared");
                    return TailerExit::FileRemoved;
                }
                Err(e) => {
                    warn!(path = %self.cursor.path().display(), error = %e, "Log read failed");
                    tokio::time::sleep(self.error_backoff).await;
                    continue;
                }
            }

            if !self.matcher.is_running().running {
                self.drain_rest().await;
                return TailerExit::ProcessExited;
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
