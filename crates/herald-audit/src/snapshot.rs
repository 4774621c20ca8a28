//! Per-scope invite use-count snapshots.
//!
//! The store keeps exactly one [`InviteSnapshot`] per tracked scope. Each scope
//! has its own async mutex so that a refresh triggered by an invite
//! notification cannot interleave with the read-then-overwrite performed
//! while resolving a join. Different scopes never contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::directory::Directory;
use crate::error::DirectoryError;
use crate::model::{Invite, ScopeId};

/// Mapping of invite code to use count for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InviteSnapshot {
    uses: HashMap<String, u64>,
}

impl InviteSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_invites(invites: &[Invite]) -> Self {
        Self {
            uses: invites
                .iter()
                .map(|i| (i.code.clone(), i.uses))
                .collect(),
        }
    }

    /// Recorded use count of `code`, or 0 when the code is unknown.
    pub fn uses(&self, code: &str) -> u64 {
        self.uses.get(code).copied().unwrap_or(0)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.uses.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.uses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty()
    }
}

type Slot = Arc<Mutex<InviteSnapshot>>;

/// Holds the last known invite snapshot of every tracked scope.
pub struct SnapshotStore {
    directory: Arc<dyn Directory>,
    slots: RwLock<HashMap<ScopeId, Slot>>,
}

impl SnapshotStore {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the live invite list and overwrite the stored snapshot.
    ///
    /// Any fetch failure stores an empty snapshot; the failure is logged and
    /// never returned.
    pub async fn refresh(&self, scope: ScopeId) -> InviteSnapshot {
        let mut guard = self.lock(scope).await;
        let snapshot = match self.directory.list_invites(scope).await {
            Ok(invites) => InviteSnapshot::from_invites(&invites),
            Err(err) => {
                log_fetch_failure(scope, &err);
                InviteSnapshot::empty()
            }
        };
        *guard = snapshot.clone();

        tracing::debug!(scope, invites = snapshot.len(), "Invite snapshot refreshed");
        snapshot
    }

    /// Last stored snapshot, or an empty one for an unknown scope.
    pub async fn get(&self, scope: ScopeId) -> InviteSnapshot {
        match self.existing_slot(scope) {
            Some(slot) => slot.lock().await.clone(),
            None => InviteSnapshot::empty(),
        }
    }

    /// Exclusive access to a scope's snapshot, creating the scope if needed.
    ///
    /// Held across a read-fetch-overwrite sequence to keep it atomic with
    /// respect to other mutations of the same scope.
    pub async fn lock(&self, scope: ScopeId) -> OwnedMutexGuard<InviteSnapshot> {
        self.slot(scope).lock_owned().await
    }

    /// Drop a scope the engine has left.
    pub fn forget(&self, scope: ScopeId) -> bool {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&scope)
            .is_some()
    }

    pub fn is_tracked(&self, scope: ScopeId) -> bool {
        self.existing_slot(scope).is_some()
    }

    pub fn tracked_scopes(&self) -> Vec<ScopeId> {
        let mut scopes: Vec<_> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        scopes.sort_unstable();
        scopes
    }

    fn existing_slot(&self, scope: ScopeId) -> Option<Slot> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scope)
            .cloned()
    }

    fn slot(&self, scope: ScopeId) -> Slot {
        if let Some(slot) = self.existing_slot(scope) {
            return slot;
        }
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(scope)
            .or_default()
            .clone()
    }
}

pub(crate) fn log_fetch_failure(scope: ScopeId, err: &DirectoryError) {
    match err {
        DirectoryError::PermissionDenied => {
            tracing::warn!(scope, "Missing permission to read invites")
        }
        other => tracing::warn!(scope, error = %other, "Failed to read invites"),
    }
}
