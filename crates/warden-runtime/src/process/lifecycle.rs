//! Start/stop/restart of the managed process.
//!
//! The controller keeps no handle on the managed process: every query
//! re-derives the process set from the OS process table, so a process
//! restarted behind our back is still found.
//!
//! # States
//!
//! ```text
//! STOPPED --start--> STARTING --settled + found--> RUNNING
//!    ^                   |                            |
//!    +---- not found ----+                            |
//!    +--------------------- stop ---------------------+
//! ```
//!
//! Only one lifecycle operation runs at a time; a second one issued while
//! the first is in flight is declined with [`DeclineReason::Busy`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use warden_core::{
    ChatId, ControlError, ControlResult, DeclineReason, ManagedProcess, ProcessLauncherPort,
    RestartReport, Settings, StartReport, StatusReport, StopMode, StopOutcome, TermSignal,
};

use super::matcher::ProcessMatcher;
use crate::broadcast::DebugBroadcaster;
use crate::config::TargetConfig;
use crate::logs::{LogCursor, LogTailer, TailerExit};
use crate::text::tail_chars;

/// Characters of startup output quoted when a start fails.
const STARTUP_EXCERPT_CHARS: usize = 500;

/// Holds the single active log tailer task.
#[derive(Debug, Default)]
pub struct TailerSlot {
    handle: Mutex<Option<JoinHandle<TailerExit>>>,
}

impl TailerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new tailer, aborting the previous one.
    pub fn replace(&self, handle: JoinHandle<TailerExit>) {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    /// Abort the current tailer, if any. Returns whether one was still running.
    pub fn cancel(&self) -> bool {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        slot.take().is_some_and(|handle| {
            let running = !handle.is_finished();
            handle.abort();
            running
        })
    }

    /// Whether a tailer is installed and has not finished.
    pub fn is_active(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// Supervises the managed process.
pub struct LifecycleController {
    matcher: Arc<ProcessMatcher>,
    launcher: Arc<dyn ProcessLauncherPort>,
    target: TargetConfig,
    settings: Settings,
    broadcaster: Arc<DebugBroadcaster>,
    tailer: TailerSlot,
    op_lock: tokio::sync::Mutex<()>,
}

impl LifecycleController {
    pub fn new(
        matcher: Arc<ProcessMatcher>,
        launcher: Arc<dyn ProcessLauncherPort>,
        target: TargetConfig,
        settings: Settings,
        broadcaster: Arc<DebugBroadcaster>,
    ) -> Self {
        Self {
            matcher,
            launcher,
            target,
            settings,
            broadcaster,
            tailer: TailerSlot::new(),
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn matcher(&self) -> &Arc<ProcessMatcher> {
        &self.matcher
    }

    /// Whether the managed process runs, and since when. Always succeeds.
    pub fn status(&self) -> StatusReport {
        self.matcher.is_running()
    }

    /// Whether a log tailer is currently streaming.
    pub fn tailer_active(&self) -> bool {
        self.tailer.is_active()
    }

    /// Start the managed process, optionally through the proxy relay.
    pub async fn start(&self, alternate_route: bool) -> ControlResult<StartReport> {
        let _guard = self.try_lock()?;
        self.start_locked(alternate_route).await
    }

    /// Stop every managed process, escalating to a kill after `timeout`.
    pub async fn stop(&self, timeout: Duration) -> ControlResult<StopOutcome> {
        let _guard = self.try_lock()?;
        let captured = self.matcher.find_managed_processes();
        Ok(self.stop_captured(captured, timeout).await)
    }

    /// Stop then start, reusing the process set captured for the stop.
    ///
    /// Only a declined lock fails the whole call; once the stop has run,
    /// a failed start is reported inside the [`RestartReport`].
    pub async fn restart(
        &self,
        timeout: Duration,
        alternate_route: bool,
    ) -> ControlResult<RestartReport> {
        let _guard = self.try_lock()?;
        let captured = self.matcher.find_managed_processes();
        let stop = self.stop_captured(captured, timeout).await;
        let start = self.start_locked(alternate_route).await;
        if let Err(e) = &start {
            warn!(error = %e, "Restart could not start the managed process");
        }
        Ok(RestartReport { stop, start })
    }

    /// Start streaming to the current observers if the process is already
    /// running and no tailer is active. Returns whether a tailer was spawned.
    pub fn resume_streaming(&self) -> bool {
        if self.broadcaster.observers().is_empty() {
            return false;
        }
        self.ensure_tailer()
    }

    /// Add `chat` to the observers and start streaming if the process runs.
    ///
    /// Returns `false` if the chat was already observing.
    pub fn subscribe_debug(&self, chat: ChatId) -> bool {
        let added = self.broadcaster.observers().add(chat);
        self.ensure_tailer();
        added
    }

    /// Remove `chat` from the observers; the last one out stops the tailer.
    pub fn unsubscribe_debug(&self, chat: ChatId) -> bool {
        let removed = self.broadcaster.observers().remove(chat);
        if removed && self.broadcaster.observers().is_empty() && self.tailer.cancel() {
            debug!("Last observer left, log tailer cancelled");
        }
        removed
    }

    fn ensure_tailer(&self) -> bool {
        if self.tailer.is_active() || !self.status().running {
            return false;
        }
        info!("Managed process is running, log streaming started");
        self.spawn_tailer();
        true
    }

    fn try_lock(&self) -> ControlResult<tokio::sync::MutexGuard<'_, ()>> {
        self.op_lock
            .try_lock()
            .map_err(|_| DeclineReason::Busy.into())
    }

    async fn start_locked(&self, alternate_route: bool) -> ControlResult<StartReport> {
        if alternate_route && !self.target.relay_available() {
            return Err(DeclineReason::RelayMissing(self.target.relay.clone()).into());
        }
        if !self.target.workdir().is_dir() {
            return Err(DeclineReason::WorkdirMissing(self.target.workdir.clone()).into());
        }
        if self.status().running {
            return Err(DeclineReason::AlreadyRunning.into());
        }

        let spec = self.target.launch_spec(alternate_route);
        let launcher_pid = self.launcher.launch(&spec)?;
        info!(pid = %launcher_pid, alternate_route, "Managed process spawned, waiting to settle");

        tokio::time::sleep(self.settings.settle_delay).await;

        if !self.status().running {
            warn!(pid = %launcher_pid, "Managed process did not come up");
            return Err(ControlError::Process(self.startup_failure_message().await));
        }

        let tailing = !self.broadcaster.observers().is_empty();
        if tailing {
            self.spawn_tailer();
        }
        self.broadcaster
            .send_to_observers(&format!("Managed process started (PID {launcher_pid})"))
            .await;

        Ok(StartReport {
            launcher_pid,
            alternate_route,
            tailing,
        })
    }

    async fn stop_captured(&self, captured: Vec<ManagedProcess>, timeout: Duration) -> StopOutcome {
        if captured.is_empty() {
            return StopOutcome::WasNotRunning;
        }

        let table = self.matcher.table();
        for process in &captured {
            if let Err(e) = table.signal(process.pid, TermSignal::Graceful) {
                debug!(pid = %process.pid, error = %e, "Graceful signal failed");
            }
        }

        let started = Instant::now();
        let mut alive: Vec<u32> = captured.iter().map(|p| p.pid).collect();
        let mut mode = StopMode::Forced;

        while started.elapsed() < timeout {
            tokio::time::sleep(self.settings.stop_poll_interval).await;
            alive.retain(|&pid| table.is_alive(pid));
            if alive.is_empty() {
                mode = StopMode::Graceful;
                break;
            }
        }

        if mode == StopMode::Forced {
            for &pid in &alive {
                if let Err(e) = table.signal(pid, TermSignal::Forced) {
                    debug!(pid = %pid, error = %e, "Forced signal failed");
                }
            }
        }

        info!(%mode, count = captured.len(), elapsed = ?started.elapsed(), "Managed process stopped");
        self.broadcaster
            .send_to_observers(&format!("Managed process stopped ({mode})"))
            .await;

        StopOutcome::Stopped {
            mode,
            processes: captured,
        }
    }

    fn spawn_tailer(&self) {
        let tailer = LogTailer::new(
            LogCursor::new(&self.target.tail_file),
            Arc::clone(&self.matcher),
            Arc::clone(&self.broadcaster),
            &self.settings,
        );
        self.tailer.replace(tokio::spawn(tailer.run()));
    }

    async fn startup_failure_message(&self) -> String {
        let base = "managed process did not come up";
        match tokio::fs::read(&self.target.tail_file).await {
            Ok(raw) => {
                let output = String::from_utf8_lossy(&raw);
                let output = output.trim();
                if output.is_empty() {
                    base.to_string()
                } else {
                    format!("{base}: {}", tail_chars(output, STARTUP_EXCERPT_CHARS))
                }
            }
            Err(_) => base.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::ObserverRegistry;
    use crate::test_support::{FakeLauncher, FakeTable, RecordingSender};
    use tempfile::{TempDir, tempdir};
    use warden_core::ErrorKind;

    const CMDLINE: &[&str] = &["/srv/venv/bin/python3", "-m", "heroku", "--no-web"];

    struct Fixture {
        _dir: TempDir,
        table: Arc<FakeTable>,
        launcher: Arc<FakeLauncher>,
        sender: Arc<RecordingSender>,
        observers: Arc<ObserverRegistry>,
        controller: Arc<LifecycleController>,
    }

    fn fixture(launch_spawns: bool) -> Fixture {
        let dir = tempdir().unwrap();
        let table = Arc::new(FakeTable::new());
        let launcher = Arc::new(FakeLauncher::new(
            table.clone(),
            launch_spawns.then_some(CMDLINE),
        ));
        let target = TargetConfig::new(dir.path()).with_relay(dir.path().join("no-relay"));
        let matcher = Arc::new(ProcessMatcher::new(table.clone(), target.markers()));
        let sender = Arc::new(RecordingSender::new());
        let settings = Settings::default();
        let observers = Arc::new(ObserverRegistry::new());
        let broadcaster = Arc::new(DebugBroadcaster::new(
            sender.clone(),
            observers.clone(),
            &settings,
        ));
        let controller = Arc::new(LifecycleController::new(
            matcher,
            launcher.clone(),
            target,
            settings,
            broadcaster,
        ));
        Fixture {
            _dir: dir,
            table,
            launcher,
            sender,
            observers,
            controller,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_graceful_when_all_exit_in_time() {
        let f = fixture(false);
        f.table.add(100, 10, CMDLINE, Some(Duration::from_secs(3)));
        f.table.add(101, 11, CMDLINE, Some(Duration::from_secs(5)));

        let started = Instant::now();
        let outcome = f.controller.stop(Duration::from_secs(15)).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(outcome.mode(), Some(StopMode::Graceful));
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
        assert_eq!(
            f.table.signals(),
            vec![(100, TermSignal::Graceful), (101, TermSignal::Graceful)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_forces_survivors_after_timeout() {
        let f = fixture(false);
        f.table.add(100, 10, CMDLINE, Some(Duration::from_secs(1)));
        f.table.add(101, 11, CMDLINE, None);

        let outcome = f.controller.stop(Duration::from_secs(15)).await.unwrap();

        assert_eq!(outcome.mode(), Some(StopMode::Forced));
        assert_eq!(
            f.table.signals(),
            vec![
                (100, TermSignal::Graceful),
                (101, TermSignal::Graceful),
                (101, TermSignal::Forced)
            ]
        );
        assert!(f.controller.matcher().find_managed_processes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_not_running_sends_nothing() {
        let f = fixture(false);
        f.table.add(7, 1, &["bash"], None);

        let outcome = f.controller.stop(Duration::from_secs(15)).await.unwrap();

        assert_eq!(outcome, StopOutcome::WasNotRunning);
        assert!(f.table.signals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_declined_when_running() {
        let f = fixture(true);
        f.table.add(100, 10, CMDLINE, None);

        let err = f.controller.start(false).await.unwrap_err();

        assert_eq!(err, ControlError::Declined(DeclineReason::AlreadyRunning));
        assert!(f.launcher.launches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_declined_without_relay() {
        let f = fixture(true);

        let err = f.controller.start(true).await.unwrap_err();

        assert!(matches!(err, ControlError::Declined(DeclineReason::RelayMissing(_))));
        assert!(f.launcher.launches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_waits_for_settle_and_confirms() {
        let f = fixture(true);

        let started = Instant::now();
        let report = f.controller.start(false).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(report.launcher_pid, 500);
        assert!(!report.alternate_route);
        assert!(!report.tailing);

        let launches = f.launcher.launches();
        assert_eq!(launches.len(), 1);
        assert!(launches[0].command.ends_with("-m heroku --no-web"));
        assert!(launches[0].env.iter().any(|(k, _)| k == "PATH"));
        assert!(f.controller.status().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_reports_process_error_when_nothing_comes_up() {
        let f = fixture(false);
        std::fs::write(&f.controller.target().tail_file, "ModuleNotFoundError: heroku\n").unwrap();

        let err = f.controller.start(false).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Process);
        assert!(err.to_string().contains("ModuleNotFoundError"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_reuses_captured_set() {
        let f = fixture(true);
        f.table.add(100, 10, CMDLINE, Some(Duration::from_secs(1)));

        let report = f
            .controller
            .restart(Duration::from_secs(10), false)
            .await
            .unwrap();

        assert_eq!(report.stop.mode(), Some(StopMode::Graceful));
        assert_eq!(report.start.unwrap().launcher_pid, 500);
        assert_eq!(f.table.signals(), vec![(100, TermSignal::Graceful)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_operation_is_declined() {
        let f = fixture(false);
        f.table.add(100, 10, CMDLINE, None);

        let controller = Arc::clone(&f.controller);
        let stopping = tokio::spawn(async move { controller.stop(Duration::from_secs(15)).await });
        tokio::task::yield_now().await;

        let err = f.controller.start(false).await.unwrap_err();
        assert_eq!(err, ControlError::Declined(DeclineReason::Busy));

        let outcome = stopping.await.unwrap().unwrap();
        assert_eq!(outcome.mode(), Some(StopMode::Forced));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_with_observers_starts_tailer_and_announces() {
        let f = fixture(true);
        assert!(f.controller.subscribe_debug(ChatId(9)));
        assert!(!f.controller.tailer_active());

        let report = f.controller.start(false).await.unwrap();

        assert!(report.tailing);
        assert!(f.controller.tailer_active());
        assert!(
            f.sender
                .texts()
                .iter()
                .any(|(chat, text)| *chat == ChatId(9) && text.contains("started"))
        );

        assert!(f.controller.unsubscribe_debug(ChatId(9)));
        assert!(!f.controller.tailer_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_while_running_starts_tailer_once() {
        let f = fixture(false);
        f.table.add(100, 10, CMDLINE, None);

        assert!(f.controller.subscribe_debug(ChatId(1)));
        assert!(f.controller.tailer_active());
        assert!(f.controller.subscribe_debug(ChatId(2)));
        assert!(!f.controller.subscribe_debug(ChatId(2)));
        assert!(f.controller.tailer_active());
    }

    #[tokio::test]
    async fn test_tailer_slot_cancel_is_idempotent() {
        let slot = TailerSlot::new();
        assert!(!slot.cancel());

        slot.replace(tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            TailerExit::ProcessExited
        }));
        assert!(slot.is_active());
        assert!(slot.cancel());
        assert!(!slot.cancel());
        assert!(!slot.is_active());
    }

    #[tokio::test]
    async fn test_tailer_slot_replace_aborts_previous() {
        let slot = TailerSlot::new();
        let (alive_tx, alive_rx) = tokio::sync::oneshot::channel::<()>();
        let first = tokio::spawn(async move {
            let _alive = alive_tx;
            tokio::time::sleep(Duration::from_secs(60)).await;
            TailerExit::ProcessExited
        });
        let first_abort = first.abort_handle();
        slot.replace(first);

        slot.replace(tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            TailerExit::ProcessExited
        }));

        // The first task drops its sender only when it is aborted
        assert!(alive_rx.await.is_err());
        assert!(first_abort.is_finished());
        assert!(slot.is_active());
        assert!(slot.cancel());
        assert!(!slot.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restored_observers_resume_streaming() {
        let f = fixture(false);
        f.observers.add(ChatId(5));
        f.table.add(100, 10, CMDLINE, None);
        assert!(!f.controller.tailer_active());

        assert!(f.controller.resume_streaming());
        assert!(f.controller.tailer_active());
        assert!(!f.controller.resume_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_streaming_needs_observers_and_process() {
        let f = fixture(false);
        f.table.add(100, 10, CMDLINE, None);
        assert!(!f.controller.resume_streaming());

        let f = fixture(false);
        f.observers.add(ChatId(5));
        assert!(!f.controller.resume_streaming());
        assert!(!f.controller.tailer_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_on_for_existing_observer_restarts_streaming() {
        let f = fixture(false);
        f.observers.add(ChatId(5));
        f.table.add(100, 10, CMDLINE, None);

        assert!(!f.controller.subscribe_debug(ChatId(5)));
        assert!(f.controller.tailer_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_reports_stop_when_start_fails() {
        let f = fixture(false);
        f.table.add(100, 10, CMDLINE, Some(Duration::from_secs(1)));

        let report = f
            .controller
            .restart(Duration::from_secs(10), false)
            .await
            .unwrap();

        assert_eq!(report.stop.mode(), Some(StopMode::Graceful));
        assert_eq!(report.start.unwrap_err().kind(), ErrorKind::Process);
    }
}
