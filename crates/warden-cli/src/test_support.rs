//! Test doubles shared by the handler tests.

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use mockall::mock;
use warden_core::{
    ChatError, ChatId, ChatSenderPort, LaunchSpec, ProcessEntry, ProcessError,
    ProcessLauncherPort, ProcessTablePort, Settings, TermSignal, UserId,
};
use warden_runtime::{AccessList, ObserverRegistry, TargetConfig};

use crate::bootstrap::AppContext;

mock! {
    pub Table {}

    impl ProcessTablePort for Table {
        fn snapshot(&self) -> Vec<ProcessEntry>;
        fn is_alive(&self, pid: u32) -> bool;
        fn signal(&self, pid: u32, signal: TermSignal) -> Result<(), ProcessError>;
    }
}

mock! {
    pub Launcher {}

    impl ProcessLauncherPort for Launcher {
        fn launch(&self, spec: &LaunchSpec) -> Result<u32, ProcessError>;
    }
}

/// A process table with no managed process in it.
pub fn empty_table() -> Arc<MockTable> {
    let mut table = MockTable::new();
    table.expect_snapshot().returning(Vec::new);
    table.expect_is_alive().returning(|_| false);
    Arc::new(table)
}

/// Records outbound messages.
#[derive(Default)]
pub struct RecordingSender {
    texts: Mutex<Vec<(ChatId, String)>>,
    documents: Mutex<Vec<(ChatId, String, Vec<u8>, String)>>,
    failing: AtomicBool,
}

impl RecordingSender {
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn texts(&self) -> Vec<(ChatId, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn documents(&self) -> Vec<(ChatId, String, Vec<u8>, String)> {
        self.documents.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), ChatError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChatError::Network("unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatSenderPort for RecordingSender {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ChatError> {
        self.check()?;
        self.texts.lock().unwrap().push((chat, text.to_string()));
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        file_name: &str,
        content: Vec<u8>,
        caption: &str,
    ) -> Result<(), ChatError> {
        self.check()?;
        self.documents.lock().unwrap().push((
            chat,
            file_name.to_string(),
            content,
            caption.to_string(),
        ));
        Ok(())
    }
}

/// Compose a context over `table` whose launcher must never be called.
pub fn context_with(
    table: Arc<dyn ProcessTablePort>,
    sender: Arc<RecordingSender>,
    workdir: &Path,
    owner: UserId,
    users: impl IntoIterator<Item = UserId>,
) -> AppContext {
    let mut launcher = MockLauncher::new();
    launcher.expect_launch().never();

    AppContext::compose(
        table,
        Arc::new(launcher),
        sender,
        Arc::new(AccessList::new(owner, users)),
        Arc::new(ObserverRegistry::new()),
        TargetConfig::new(workdir),
        &Settings::default(),
    )
}
