//! Interval health probing of the control channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use warden_core::{BotIdentity, ChatConnectionPort, ChatError, Settings};

use super::state::ReconnectState;

/// Outcome of one supervised restart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartAttempt {
    /// Another restart was already in progress; nothing was done.
    Skipped,
    /// The channel was stopped, re-initialized and is listening again.
    Restarted,
    /// A step failed; the attempt counter was incremented.
    Failed(ChatError),
}

/// Periodically probes the control channel and restarts it after
/// repeated failures.
pub struct ConnectionWatchdog {
    connection: Arc<dyn ChatConnectionPort>,
    state: Arc<ReconnectState>,
    interval: Duration,
    probe_timeout: Duration,
    failure_threshold: u32,
}

impl ConnectionWatchdog {
    pub fn new(
        connection: Arc<dyn ChatConnectionPort>,
        state: Arc<ReconnectState>,
        settings: &Settings,
    ) -> Self {
        Self {
            connection,
            state,
            interval: settings.probe_interval,
            probe_timeout: settings.probe_timeout,
            failure_threshold: settings.failure_threshold,
        }
    }

    pub fn state(&self) -> &Arc<ReconnectState> {
        &self.state
    }

    /// One bounded "who am I" round trip.
    pub async fn probe(&self) -> Result<BotIdentity, ChatError> {
        tokio::time::timeout(self.probe_timeout, self.connection.whoami())
            .await
            .unwrap_or(Err(ChatError::Timeout))
    }

    /// Run one probe and act on the result.
    ///
    /// Returns the restart attempt if this probe crossed the failure
    /// threshold. The failure streak is reset after any restart attempt,
    /// successful or not; the next interval is the backoff.
    pub async fn tick(&self) -> Option<RestartAttempt> {
        match self.probe().await {
            Ok(identity) => {
                debug!(bot = %identity.name, "Control channel healthy");
                self.state.record_success();
                None
            }
            Err(e) => {
                let failures = self.state.record_failure();
                warn!(error = %e, failures, threshold = self.failure_threshold, "Control channel probe failed");
                if failures < self.failure_threshold {
                    return None;
                }
                let attempt = self.restart_channel().await;
                self.state.reset_failures();
                Some(attempt)
            }
        }
    }

    /// Stop, re-initialize and resume the channel listener.
    ///
    /// A no-op returning [`RestartAttempt::Skipped`] while another restart
    /// is running.
    pub async fn restart_channel(&self) -> RestartAttempt {
        let Some(_guard) = self.state.try_begin() else {
            debug!("Channel restart already in progress, skipping");
            return RestartAttempt::Skipped;
        };

        info!("Restarting control channel");
        match self.restart_steps().await {
            Ok(()) => {
                self.state.reset_attempts();
                self.state.record_success();
                info!("Control channel restarted");
                RestartAttempt::Restarted
            }
            Err(e) => {
                let attempts = self.state.record_attempt();
                error!(error = %e, attempts, "Control channel restart failed");
                RestartAttempt::Failed(e)
            }
        }
    }

    async fn restart_steps(&self) -> Result<(), ChatError> {
        match self.connection.stop_listening().await {
            Ok(()) | Err(ChatError::NotListening) => {}
            Err(e) => return Err(e),
        }
        self.connection.initialize().await?;
        self.connection.start_listening().await
    }

    /// Probe every interval until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval = ?self.interval, "Connection watchdog started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(attempt) = self.tick().await {
                        debug!(?attempt, "Watchdog restart attempt finished");
                    }
                }
                () = cancel.cancelled() => {
                    info!("Connection watchdog cancelled");
                    break;
                }
            }
        }
    }
}
