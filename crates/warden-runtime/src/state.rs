//! Persistent operator state.
//!
//! Authorized users and debug observers survive a restart of the
//! supervisor when a state file is configured. The file is plain JSON:
//!
//! ```json
//! { "users": [123, 456], "observers": [123] }
//! ```
//!
//! Writes go through a temp file + rename so a crash mid-write never
//! leaves a truncated file behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use warden_core::{ChatId, UserId};

/// Errors reading or writing the state file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("State file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("State file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Content of the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub users: Vec<UserId>,
    #[serde(default)]
    pub observers: Vec<ChatId>,
}

/// JSON-backed store for [`PersistedState`].
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    current: Mutex<PersistedState>,
}

impl StateStore {
    /// Open the store at `path`, loading existing content.
    ///
    /// A missing file yields an empty state; a malformed file is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let current = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => PersistedState::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), ?current, "Loaded state file");
        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current state.
    pub fn load(&self) -> PersistedState {
        self.lock().clone()
    }

    /// Replace the persisted user list.
    pub fn set_users(&self, users: Vec<UserId>) -> Result<(), StateError> {
        let mut state = self.lock();
        state.users = users;
        write_atomic(&self.path, &state)
    }

    /// Replace the persisted observer list.
    pub fn set_observers(&self, observers: Vec<ChatId>) -> Result<(), StateError> {
        let mut state = self.lock();
        state.observers = observers;
        write_atomic(&self.path, &state)
    }

    /// Like [`set_users`](Self::set_users) but logs failures instead of returning them.
    pub fn persist_users(&self, users: Vec<UserId>) {
        if let Err(e) = self.set_users(users) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist users");
        }
    }

    /// Like [`set_observers`](Self::set_observers) but logs failures instead of returning them.
    pub fn persist_observers(&self, observers: Vec<ChatId>) {
        if let Err(e) = self.set_observers(observers) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist observers");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PersistedState> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn write_atomic(path: &Path, state: &PersistedState) -> Result<(), StateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, serde_json::to_vec_pretty(state)?)?;
    fs::rename(&temp, path)?;
    Ok(())
}
