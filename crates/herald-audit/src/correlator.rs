//! Audit trail correlation.
//!
//! Audit entries are written by the directory some time after the
//! notification they explain, so a lookup only trusts an entry that is
//! recent enough. Not finding an entry is an ordinary outcome.

use std::sync::Arc;
use std::time::Duration;

use herald_core::WindowsConfig;

use crate::clock::Clock;
use crate::directory::Directory;
use crate::model::{ActionKind, AuditEntry, Identity, ScopeId, UserId};

/// Who caused a moderation or update event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorAttribution {
    Resolved {
        actor: Identity,
        reason: Option<String>,
    },
    Unknown,
}

impl ActorAttribution {
    pub fn from_entry(entry: Option<&AuditEntry>) -> Self {
        match entry.and_then(|e| e.actor.clone().map(|actor| (actor, e.reason.clone()))) {
            Some((actor, reason)) => Self::Resolved { actor, reason },
            None => Self::Unknown,
        }
    }

    /// Actor rendered for a record; "Unknown" when unresolved.
    pub fn actor_label(&self) -> String {
        match self {
            Self::Resolved { actor, .. } => actor.to_string(),
            Self::Unknown => "Unknown".to_string(),
        }
    }
}

/// Finds the audit entry explaining an observed event.
pub struct AuditCorrelator {
    directory: Arc<dyn Directory>,
    clock: Arc<dyn Clock>,
    lookback: usize,
    windows: WindowsConfig,
}

impl AuditCorrelator {
    pub fn new(
        directory: Arc<dyn Directory>,
        clock: Arc<dyn Clock>,
        lookback: usize,
        windows: WindowsConfig,
    ) -> Self {
        Self {
            directory,
            clock,
            lookback,
            windows,
        }
    }

    /// Default recency window for an action kind.
    pub fn window(&self, action: ActionKind) -> Duration {
        let secs = match action {
            ActionKind::Kick => self.windows.kick,
            ActionKind::Ban => self.windows.ban,
            ActionKind::MemberRoleUpdate => self.windows.role_update,
            ActionKind::MemberUpdate => self.windows.member_update,
        };
        Duration::from_secs(secs)
    }

    /// [`find_actor_within`](Self::find_actor_within) using the action's default window.
    pub async fn find_actor(
        &self,
        scope: ScopeId,
        action: ActionKind,
        target: UserId,
    ) -> Option<AuditEntry> {
        self.find_actor_within(scope, action, target, self.window(action))
            .await
    }

    /// Newest entry of `action` targeting `target`, if it is at most `window` old.
    ///
    /// Only the first entry for the target is considered; if it is outside
    /// the window the lookup reports nothing. Fetch errors also report nothing.
    pub async fn find_actor_within(
        &self,
        scope: ScopeId,
        action: ActionKind,
        target: UserId,
        window: Duration,
    ) -> Option<AuditEntry> {
        let entries = match self
            .directory
            .recent_audit_entries(scope, action, self.lookback)
            .await
        {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(scope, %action, target, error = %err, "Failed to read audit trail");
                return None;
            }
        };

        let entry = entries
            .into_iter()
            .find(|e| e.target_id == Some(target))?;

        let age = self.clock.now() - entry.created_at;
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        if age > window {
            tracing::debug!(
                scope,
                %action,
                target,
                age_ms = age.num_milliseconds(),
                window_ms = window.num_milliseconds(),
                "Audit entry outside window"
            );
            return None;
        }

        tracing::debug!(scope, %action, target, age_ms = age.num_milliseconds(), "Audit entry matched");
        Some(entry)
    }

    /// Convenience wrapper returning the attribution directly.
    pub async fn attribute(
        &self,
        scope: ScopeId,
        action: ActionKind,
        target: UserId,
    ) -> ActorAttribution {
        let entry = self.find_actor(scope, action, target).await;
        ActorAttribution::from_entry(entry.as_ref())
    }
}
