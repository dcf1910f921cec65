//! Outer retry loop around the control channel listener.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use warden_core::{ChatConnectionPort, ChatError, Settings};

use super::backoff::Backoff;
use super::probe::ConnectionWatchdog;
use super::state::ReconnectState;

/// Why the polling supervisor gave up.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The configured retry budget ran out.
    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: ChatError },

    /// A non-transient error (bad token, rejected request).
    #[error("Control channel failed: {0}")]
    Fatal(ChatError),

    /// Shutdown was requested while waiting to retry.
    #[error("Cancelled")]
    Cancelled,
}

/// Establishes the listener with exponential backoff and then hands
/// liveness over to the [`ConnectionWatchdog`].
pub struct PollingSupervisor {
    connection: Arc<dyn ChatConnectionPort>,
    state: Arc<ReconnectState>,
    watchdog: Arc<ConnectionWatchdog>,
    backoff: Backoff,
    max_retries: Option<u32>,
    cancel: CancellationToken,
    watchdog_task: Mutex<Option<JoinHandle<()>>>,
}

impl PollingSupervisor {
    /// Create a supervisor sharing `watchdog`'s reconnect state.
    pub fn new(
        connection: Arc<dyn ChatConnectionPort>,
        watchdog: Arc<ConnectionWatchdog>,
        settings: &Settings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connection,
            state: Arc::clone(watchdog.state()),
            watchdog,
            backoff: Backoff::from_settings(settings),
            max_retries: settings.max_retries,
            cancel,
            watchdog_task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &Arc<ReconnectState> {
        &self.state
    }

    /// Start listening, retrying transient failures with backoff.
    ///
    /// With `max_retries = None` this only returns an error for a
    /// non-transient failure or cancellation. The first success resets the
    /// attempt counter and starts the watchdog (once per supervisor).
    pub async fn establish(&self) -> Result<(), SupervisorError> {
        loop {
            let last_error = match self.connection.start_listening().await {
                Ok(()) | Err(ChatError::AlreadyListening) => {
                    self.state.reset_attempts();
                    self.state.record_success();
                    self.spawn_watchdog();
                    info!("Control channel listening");
                    return Ok(());
                }
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(SupervisorError::Fatal(e)),
            };

            let attempts = self.state.record_attempt();
            if self.max_retries.is_some_and(|max| attempts > max) {
                return Err(SupervisorError::RetriesExhausted {
                    attempts,
                    last_error,
                });
            }

            let delay = self.backoff.delay_for(attempts);
            warn!(error = %last_error, attempts, delay = ?delay, "Control channel unavailable, retrying");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.cancel.cancelled() => return Err(SupervisorError::Cancelled),
            }
        }
    }

    /// Whether the watchdog task is alive.
    pub fn watchdog_running(&self) -> bool {
        self.watchdog_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the watchdog and any pending retry.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self
            .watchdog_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
        if let Err(e) = self.connection.stop_listening().await {
            debug!(error = %e, "Listener already stopped");
        }
    }

    fn spawn_watchdog(&self) {
        let mut slot = self
            .watchdog_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let watchdog = Arc::clone(&self.watchdog);
        *slot = Some(tokio::spawn(watchdog.run(self.cancel.child_token())));
    }
}
