//! Invite attribution for member joins.
//!
//! The resolver diffs the stored snapshot ("before") against a fresh listing
//! ("after") and reports the first invite whose use count went up. When two
//! invites are consumed between refreshes the first one in listing order
//! wins; a burst of joins can therefore be misattributed.

use std::fmt;
use std::sync::Arc;

use crate::directory::Directory;
use crate::error::{DirectoryError, DirectoryErrorKind};
use crate::model::{Identity, ScopeId};
use crate::snapshot::{InviteSnapshot, SnapshotStore, log_fetch_failure};

/// Outcome of attributing a join to an entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteAttribution {
    /// A regular invite whose use count increased.
    Invite {
        code: String,
        inviter: Option<Identity>,
        uses: u64,
    },
    /// No tracked invite moved, but the scope has a vanity invite.
    Vanity { code: String },
    Unknown(UnknownInvite),
}

/// Why a join could not be attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownInvite {
    NoMatch,
    MissingPermission,
    FetchFailed(DirectoryErrorKind),
}

impl fmt::Display for UnknownInvite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => write!(f, "no invite or vanity found"),
            Self::MissingPermission => write!(f, "missing permission to read invites"),
            Self::FetchFailed(_) => write!(f, "error reading invites"),
        }
    }
}

impl From<&DirectoryError> for UnknownInvite {
    fn from(err: &DirectoryError) -> Self {
        match err {
            DirectoryError::PermissionDenied => Self::MissingPermission,
            other => Self::FetchFailed(other.kind()),
        }
    }
}

/// Attributes joins to the invite that was used.
pub struct InviteResolver {
    directory: Arc<dyn Directory>,
    store: Arc<SnapshotStore>,
}

impl InviteResolver {
    pub fn new(directory: Arc<dyn Directory>, store: Arc<SnapshotStore>) -> Self {
        Self { directory, store }
    }

    /// Work out which invite a just-joined member used.
    ///
    /// The scope's snapshot stays locked for the whole read-fetch-overwrite
    /// sequence. On a successful fetch the store is overwritten with the
    /// fresh listing before the diff is inspected. A failed fetch leaves the
    /// stored snapshot untouched.
    pub async fn resolve_join(&self, scope: ScopeId) -> InviteAttribution {
        let mut guard = self.store.lock(scope).await;
        let before = guard.clone();

        let after = match self.directory.list_invites(scope).await {
            Ok(invites) => invites,
            Err(err) => {
                log_fetch_failure(scope, &err);
                return InviteAttribution::Unknown(UnknownInvite::from(&err));
            }
        };

        *guard = InviteSnapshot::from_invites(&after);
        drop(guard);

        let used = after
            .into_iter()
            .find(|invite| invite.uses > before.uses(&invite.code));

        if let Some(invite) = used {
            tracing::debug!(scope, code = %invite.code, uses = invite.uses, "Join attributed to invite");
            return InviteAttribution::Invite {
                code: invite.code,
                inviter: invite.inviter,
                uses: invite.uses,
            };
        }

        match self.directory.vanity_invite(scope).await {
            Ok(Some(vanity)) => {
                if let Some(code) = vanity.code {
                    tracing::debug!(scope, code = %code, "Join attributed to vanity invite");
                    return InviteAttribution::Vanity { code };
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(scope, error = %err, "Vanity invite unavailable");
            }
        }

        tracing::debug!(scope, "Join could not be attributed");
        InviteAttribution::Unknown(UnknownInvite::NoMatch)
    }
}
