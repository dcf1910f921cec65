//! Owner and authorized-user bookkeeping.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;
use warden_core::UserId;

use crate::state::StateStore;

/// What a sender may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Full control.
    Owner,
    /// Read-only commands.
    User,
    /// Ignored.
    Stranger,
}

/// The owner plus the set of authorized users.
#[derive(Debug)]
pub struct AccessList {
    owner: UserId,
    users: RwLock<BTreeSet<UserId>>,
    store: Option<Arc<StateStore>>,
}

impl AccessList {
    /// In-memory access list.
    pub fn new(owner: UserId, users: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            owner,
            users: RwLock::new(users.into_iter().filter(|u| *u != owner).collect()),
            store: None,
        }
    }

    /// Access list merged with, and persisted to, `store`.
    pub fn with_store(
        owner: UserId,
        users: impl IntoIterator<Item = UserId>,
        store: Arc<StateStore>,
    ) -> Self {
        let mut list = Self::new(owner, users.into_iter().chain(store.load().users));
        list.store = Some(store);
        list
    }

    pub const fn owner(&self) -> UserId {
        self.owner
    }

    pub fn role(&self, user: UserId) -> Role {
        if user == self.owner {
            Role::Owner
        } else if self.read().contains(&user) {
            Role::User
        } else {
            Role::Stranger
        }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        user == self.owner
    }

    /// Owner or authorized user.
    pub fn is_authorized(&self, user: UserId) -> bool {
        self.role(user) != Role::Stranger
    }

    /// Authorize `user`. Returns `false` for the owner or an existing user.
    pub fn add_user(&self, user: UserId) -> bool {
        if user == self.owner {
            return false;
        }
        let added = self
            .users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user);
        if added {
            info!(%user, "User authorized");
            self.persist();
        }
        added
    }

    /// Revoke `user`. Returns `false` if it was not authorized.
    pub fn remove_user(&self, user: UserId) -> bool {
        let removed = self
            .users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user);
        if removed {
            info!(%user, "User revoked");
            self.persist();
        }
        removed
    }

    /// Authorized users, owner excluded.
    pub fn users(&self) -> Vec<UserId> {
        self.read().iter().copied().collect()
    }

    /// Owner first, then every authorized user.
    pub fn everyone(&self) -> Vec<UserId> {
        std::iter::once(self.owner).chain(self.users()).collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeSet<UserId>> {
        self.users.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            store.persist_users(self.users());
        }
    }
}
