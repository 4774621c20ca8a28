//! The external directory service the engine reads invites and audit
//! entries from.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::error::DirectoryError;
use crate::model::{ActionKind, AuditEntry, Invite, ScopeId, VanityInvite};

/// Read access to invites and the audit trail of a scope.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Live invite listing, in the directory's own order.
    async fn list_invites(&self, scope: ScopeId) -> Result<Vec<Invite>, DirectoryError>;

    /// The scope's vanity invite, if one is configured.
    async fn vanity_invite(&self, scope: ScopeId) -> Result<Option<VanityInvite>, DirectoryError>;

    /// Up to `limit` most recent audit entries of kind `action`, newest first.
    async fn recent_audit_entries(
        &self,
        scope: ScopeId,
        action: ActionKind,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, DirectoryError>;
}

/// Identifies one of the [`Directory`] calls, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryCall {
    ListInvites,
    VanityInvite,
    AuditEntries,
}

/// In-memory directory. Mutable through setters so tests and replays can
/// move the external state forward between notifications.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    invites: RwLock<HashMap<ScopeId, Vec<Invite>>>,
    vanity: RwLock<HashMap<ScopeId, VanityInvite>>,
    // newest first
    audit: RwLock<HashMap<ScopeId, Vec<AuditEntry>>>,
    failures: RwLock<HashMap<(ScopeId, DirectoryCall), DirectoryError>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the invite listing of a scope.
    pub fn set_invites(&self, scope: ScopeId, invites: Vec<Invite>) {
        write(&self.invites).insert(scope, invites);
    }

    /// Set or clear the vanity invite of a scope.
    pub fn set_vanity(&self, scope: ScopeId, vanity: Option<VanityInvite>) {
        let mut map = write(&self.vanity);
        match vanity {
            Some(v) => map.insert(scope, v),
            None => map.remove(&scope),
        };
    }

    /// Record a new audit entry; it becomes the newest one.
    pub fn push_audit_entry(&self, scope: ScopeId, entry: AuditEntry) {
        write(&self.audit).entry(scope).or_default().insert(0, entry);
    }

    /// Make `call` fail with `error` for `scope` until [`recover`](Self::recover).
    pub fn fail(&self, scope: ScopeId, call: DirectoryCall, error: DirectoryError) {
        write(&self.failures).insert((scope, call), error);
    }

    pub fn recover(&self, scope: ScopeId, call: DirectoryCall) {
        write(&self.failures).remove(&(scope, call));
    }

    fn check(&self, scope: ScopeId, call: DirectoryCall) -> Result<(), DirectoryError> {
        let failures = self
            .failures
            .read()
            .map_err(|e| DirectoryError::Unavailable(format!("failed to acquire read lock: {}", e)))?;
        match failures.get(&(scope, call)) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn list_invites(&self, scope: ScopeId) -> Result<Vec<Invite>, DirectoryError> {
        self.check(scope, DirectoryCall::ListInvites)?;
        let invites = self
            .invites
            .read()
            .map_err(|e| DirectoryError::Unavailable(format!("failed to acquire read lock: {}", e)))?;
        Ok(invites.get(&scope).cloned().unwrap_or_default())
    }

    async fn vanity_invite(&self, scope: ScopeId) -> Result<Option<VanityInvite>, DirectoryError> {
        self.check(scope, DirectoryCall::VanityInvite)?;
        let vanity = self
            .vanity
            .read()
            .map_err(|e| DirectoryError::Unavailable(format!("failed to acquire read lock: {}", e)))?;
        Ok(vanity.get(&scope).cloned())
    }

    async fn recent_audit_entries(
        &self,
        scope: ScopeId,
        action: ActionKind,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, DirectoryError> {
        self.check(scope, DirectoryCall::AuditEntries)?;
        let audit = self
            .audit
            .read()
            .map_err(|e| DirectoryError::Unavailable(format!("failed to acquire read lock: {}", e)))?;
        Ok(audit
            .get(&scope)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.action == action)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Bounds every call of the wrapped directory. Calls past the bound fail
/// with [`DirectoryError::Timeout`].
pub struct TimeoutDirectory<D> {
    inner: D,
    timeout: Duration,
}

impl<D: Directory> TimeoutDirectory<D> {
    pub fn new(inner: D, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// The bound in whole milliseconds, saturating at `u64::MAX`.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    async fn bounded<T>(
        &self,
        call: &'static str,
        scope: ScopeId,
        fut: impl Future<Output = Result<T, DirectoryError>>,
    ) -> Result<T, DirectoryError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    call,
                    scope,
                    timeout_ms = self.timeout_ms(),
                    "Directory call timed out"
                );
                Err(DirectoryError::Timeout)
            }
        }
    }
}

#[async_trait]
impl<D: Directory> Directory for TimeoutDirectory<D> {
    async fn list_invites(&self, scope: ScopeId) -> Result<Vec<Invite>, DirectoryError> {
        self.bounded("list_invites", scope, self.inner.list_invites(scope))
            .await
    }

    async fn vanity_invite(&self, scope: ScopeId) -> Result<Option<VanityInvite>, DirectoryError> {
        self.bounded("vanity_invite", scope, self.inner.vanity_invite(scope))
            .await
    }

    async fn recent_audit_entries(
        &self,
        scope: ScopeId,
        action: ActionKind,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, DirectoryError> {
        self.bounded(
            "recent_audit_entries",
            scope,
            self.inner.recent_audit_entries(scope, action, limit),
        )
        .await
    }
}
