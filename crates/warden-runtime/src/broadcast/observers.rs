//! The set of chats receiving debug broadcasts.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;
use warden_core::ChatId;

use crate::state::StateStore;

/// Registry of debug observers.
///
/// Membership is idempotent. No lock is held across an await point, so a
/// plain `std` lock is enough.
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    chats: RwLock<BTreeSet<ChatId>>,
    store: Option<Arc<StateStore>>,
}

impl ObserverRegistry {
    /// Create an empty, in-memory registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded from and persisted to `store`.
    pub fn with_store(store: Arc<StateStore>) -> Self {
        let chats = store.load().observers.into_iter().collect();
        Self {
            chats: RwLock::new(chats),
            store: Some(store),
        }
    }

    /// Add an observer. Returns `false` if it was already present.
    pub fn add(&self, chat: ChatId) -> bool {
        let added = self.write(|chats| chats.insert(chat));
        if added {
            debug!(%chat, "Observer added");
            self.persist();
        }
        added
    }

    /// Remove an observer. Returns `false` if it was not present.
    pub fn remove(&self, chat: ChatId) -> bool {
        let removed = self.write(|chats| chats.remove(&chat));
        if removed {
            debug!(%chat, "Observer removed");
            self.persist();
        }
        removed
    }

    pub fn contains(&self, chat: ChatId) -> bool {
        self.read().contains(&chat)
    }

    /// Current observers in ascending id order.
    pub fn snapshot(&self) -> Vec<ChatId> {
        self.read().iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeSet<ChatId>> {
        self.chats.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write<T>(&self, f: impl FnOnce(&mut BTreeSet<ChatId>) -> T) -> T {
        let mut chats = self.chats.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut chats)
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            store.persist_observers(self.snapshot());
        }
    }
}
