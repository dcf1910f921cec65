//! In-memory fakes for the core ports.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use warden_core::{
    BotIdentity, ChatConnectionPort, ChatError, ChatId, ChatSenderPort, LaunchSpec, ProcessEntry,
    ProcessError, ProcessLauncherPort, ProcessTablePort, TermSignal,
};

/// Records every outbound message; selected chats fail.
#[derive(Default)]
pub struct RecordingSender {
    texts: Mutex<Vec<(ChatId, String)>>,
    documents: Mutex<Vec<(ChatId, String, Vec<u8>)>>,
    failing: Mutex<HashSet<ChatId>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, chat: ChatId) {
        self.failing.lock().unwrap().insert(chat);
    }

    pub fn texts(&self) -> Vec<(ChatId, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn documents(&self) -> Vec<(ChatId, String, Vec<u8>)> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSenderPort for RecordingSender {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ChatError> {
        if self.failing.lock().unwrap().contains(&chat) {
            return Err(ChatError::Network("unreachable".to_string()));
        }
        self.texts.lock().unwrap().push((chat, text.to_string()));
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        file_name: &str,
        content: Vec<u8>,
        _caption: &str,
    ) -> Result<(), ChatError> {
        if self.failing.lock().unwrap().contains(&chat) {
            return Err(ChatError::Network("unreachable".to_string()));
        }
        self.documents
            .lock()
            .unwrap()
            .push((chat, file_name.to_string(), content));
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct FakeProcess {
    entry: ProcessEntry,
    exits_after_term: Option<Duration>,
    dies_at: Option<Instant>,
}

/// Scripted process table driven by tokio's (pausable) clock.
#[derive(Default)]
pub struct FakeTable {
    processes: Mutex<Vec<FakeProcess>>,
    signals: Mutex<Vec<(u32, TermSignal)>>,
}

impl FakeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a process that exits `exits_after_term` after SIGTERM (`None` = ignores it).
    pub fn add(&self, pid: u32, start_time: u64, cmdline: &[&str], exits_after_term: Option<Duration>) {
        let entry = ProcessEntry::new(
            pid,
            start_time,
            cmdline.iter().map(ToString::to_string).collect(),
        );
        self.processes.lock().unwrap().push(FakeProcess {
            entry,
            exits_after_term,
            dies_at: None,
        });
    }

    pub fn signals(&self) -> Vec<(u32, TermSignal)> {
        self.signals.lock().unwrap().clone()
    }

    fn reap(&self) {
        let now = Instant::now();
        self.processes
            .lock()
            .unwrap()
            .retain(|p| p.dies_at.is_none_or(|at| at > now));
    }
}

impl ProcessTablePort for FakeTable {
    fn snapshot(&self) -> Vec<ProcessEntry> {
        self.reap();
        self.processes
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.entry.clone())
            .collect()
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.reap();
        self.processes
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.entry.pid == pid)
    }

    fn signal(&self, pid: u32, signal: TermSignal) -> Result<(), ProcessError> {
        self.reap();
        self.signals.lock().unwrap().push((pid, signal));
        let mut processes = self.processes.lock().unwrap();
        let idx = processes
            .iter()
            .position(|p| p.entry.pid == pid)
            .ok_or(ProcessError::NotFound(pid))?;
        match signal {
            TermSignal::Forced => {
                processes.remove(idx);
            }
            TermSignal::Graceful => {
                if let Some(delay) = processes[idx].exits_after_term {
                    processes[idx].dies_at = Some(Instant::now() + delay);
                }
            }
        }
        Ok(())
    }
}

/// Launcher that records specs and optionally spawns a matching fake process.
pub struct FakeLauncher {
    table: std::sync::Arc<FakeTable>,
    spawn_cmdline: Option<Vec<String>>,
    launches: Mutex<Vec<LaunchSpec>>,
    next_pid: AtomicU32,
}

impl FakeLauncher {
    /// `spawn_cmdline = None` simulates a launch whose process never comes up.
    pub fn new(table: std::sync::Arc<FakeTable>, spawn_cmdline: Option<&[&str]>) -> Self {
        Self {
            table,
            spawn_cmdline: spawn_cmdline.map(|c| c.iter().map(ToString::to_string).collect()),
            launches: Mutex::new(Vec::new()),
            next_pid: AtomicU32::new(500),
        }
    }

    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.launches.lock().unwrap().clone()
    }
}

impl ProcessLauncherPort for FakeLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<u32, ProcessError> {
        self.launches.lock().unwrap().push(spec.clone());
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        if let Some(cmdline) = &self.spawn_cmdline {
            let args: Vec<&str> = cmdline.iter().map(String::as_str).collect();
            self.table.add(pid, 1_700_000_000, &args, Some(Duration::from_secs(1)));
        }
        Ok(pid)
    }
}

/// Scripted control-channel connection.
#[derive(Default)]
pub struct FakeConnection {
    pub whoami_failures: Mutex<HashMap<usize, ChatError>>,
    pub whoami_calls: AtomicUsize,
    pub whoami_delay: Mutex<Option<Duration>>,
    pub start_failures: Mutex<Vec<ChatError>>,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub init_calls: AtomicUsize,
    pub restart_delay: Mutex<Option<Duration>>,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `whoami` call hang until [`Self::heal`] is called.
    pub fn hang_whoami(&self) {
        *self.whoami_delay.lock().unwrap() = Some(Duration::from_secs(3600));
    }

    pub fn heal(&self) {
        *self.whoami_delay.lock().unwrap() = None;
        self.whoami_failures.lock().unwrap().clear();
    }

    /// Queue failures for upcoming `start_listening` calls.
    pub fn queue_start_failures(&self, errors: Vec<ChatError>) {
        *self.start_failures.lock().unwrap() = errors;
    }
}

#[async_trait]
impl ChatConnectionPort for FakeConnection {
    async fn whoami(&self) -> Result<BotIdentity, ChatError> {
        let call = self.whoami_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.whoami_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.whoami_failures.lock().unwrap().remove(&call) {
            return Err(err);
        }
        Ok(BotIdentity {
            id: 1,
            name: "warden".to_string(),
            username: Some("warden_bot".to_string()),
        })
    }

    async fn initialize(&self) -> Result<(), ChatError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.restart_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn start_listening(&self) -> Result<(), ChatError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let mut failures = self.start_failures.lock().unwrap();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.remove(0))
        }
    }

    async fn stop_listening(&self) -> Result<(), ChatError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
