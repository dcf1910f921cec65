//! Shared reconnect bookkeeping.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

/// Counters shared by the interval watchdog and the polling supervisor.
///
/// `attempts` belongs to the polling supervisor and survives individual
/// probes; `consecutive_failures` belongs to the watchdog. The in-progress
/// flag is the only guard against overlapping restarts.
#[derive(Debug, Default)]
pub struct ReconnectState {
    attempts: AtomicU32,
    consecutive_failures: AtomicU32,
    last_success: Mutex<Option<DateTime<Utc>>>,
    in_progress: AtomicBool,
}

impl ReconnectState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Count one more reconnect attempt and return the new total.
    pub fn record_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }

    pub fn reset_attempts(&self) {
        self.attempts.store(0, Ordering::SeqCst);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Count one more failed probe and return the streak length.
    pub fn record_failure(&self) -> u32 {
        self.consecutive_failures
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1)
    }

    pub fn reset_failures(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    /// Note a healthy round trip: clears the failure streak.
    pub fn record_success(&self) {
        self.reset_failures();
        *self
            .last_success
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Claim the restart slot. Returns `None` if a restart is already running.
    pub fn try_begin(&self) -> Option<RestartGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RestartGuard {
                flag: &self.in_progress,
            })
    }
}

/// Clears the in-progress flag on drop, whatever path the restart took.
#[derive(Debug)]
pub struct RestartGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RestartGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
