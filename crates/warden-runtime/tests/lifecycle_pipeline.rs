//! End-to-end lifecycle against real processes: launch through the shell,
//! stream the output file to an observer, stop with SIGTERM.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;
use warden_core::{ChatError, ChatId, ChatSenderPort, Settings, StopMode, StopOutcome};
use warden_runtime::{
    DebugBroadcaster, LifecycleController, ObserverRegistry, ProcessMatcher, ShellLauncher,
    SysinfoProcessTable, TailerExit, TargetConfig,
};

#[derive(Default)]
struct CollectingSender {
    texts: Mutex<Vec<String>>,
}

impl CollectingSender {
    fn joined(&self) -> String {
        self.texts.lock().unwrap().join("\n")
    }
}

#[async_trait]
impl ChatSenderPort for CollectingSender {
    async fn send_text(&self, _chat: ChatId, text: &str) -> Result<(), ChatError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_document(
        &self,
        _chat: ChatId,
        _file_name: &str,
        _content: Vec<u8>,
        _caption: &str,
    ) -> Result<(), ChatError> {
        Ok(())
    }
}

/// A stand-in interpreter that ignores its arguments and prints forever.
fn write_fake_interpreter(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("python3");
    std::fs::write(&path, "#!/bin/sh\nwhile true; do echo tick; sleep 0.2; done\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn fast_settings() -> Settings {
    Settings {
        settle_delay: Duration::from_millis(700),
        stop_poll_interval: Duration::from_millis(100),
        tail_wait: Duration::from_secs(3),
        tail_wait_poll: Duration::from_millis(50),
        tail_interval: Duration::from_millis(50),
        flush_delay: Duration::from_millis(100),
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_start_stream_and_stop_real_process() {
    let dir = tempdir().unwrap();
    let python = write_fake_interpreter(dir.path());
    let target = TargetConfig::new(dir.path())
        .with_python(&python)
        .with_module(format!("heroku{}", std::process::id()));

    let settings = fast_settings();
    let matcher = Arc::new(ProcessMatcher::new(
        Arc::new(SysinfoProcessTable::new()),
        target.markers(),
    ));
    let sender = Arc::new(CollectingSender::default());
    let observers = Arc::new(ObserverRegistry::new());
    let broadcaster = Arc::new(DebugBroadcaster::new(sender.clone(), observers, &settings));
    let controller = LifecycleController::new(
        Arc::clone(&matcher),
        Arc::new(ShellLauncher::new()),
        target,
        settings,
        broadcaster,
    );

    assert!(!controller.status().running);
    controller.subscribe_debug(ChatId(1));

    let report = controller.start(false).await.unwrap();
    assert!(report.tailing);
    assert!(controller.status().running);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(sender.joined().contains("tick"));

    let outcome = controller.stop(Duration::from_secs(5)).await.unwrap();
    assert!(matches!(
        outcome,
        StopOutcome::Stopped { mode: StopMode::Graceful, .. }
    ));
    assert!(!controller.status().running);

    // The tailer notices the exit on its next pass
    for _ in 0..40 {
        if sender.joined().contains(TailerExit::ProcessExited.marker()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(sender.joined().contains(TailerExit::ProcessExited.marker()));
    assert!(!controller.tailer_active());

    let second = controller.stop(Duration::from_secs(5)).await.unwrap();
    assert_eq!(second, StopOutcome::WasNotRunning);
}
