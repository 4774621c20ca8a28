//! `herald replay` command implementation.
//!
//! A replay script is a YAML list of steps. Directory steps move the
//! in-memory external state forward; `notify` steps push a notification
//! through the dispatcher, exactly as the live notification layer would.
//!
//! ```yaml
//! steps:
//!   - step: set_invites
//!     scope: 1
//!     invites:
//!       - { code: abc, uses: 0 }
//!   - step: notify
//!     notification: { type: ready, scopes: [1] }
//!   - step: set_invites
//!     scope: 1
//!     invites:
//!       - { code: abc, uses: 1 }
//!   - step: notify
//!     notification:
//!       type: member_joined
//!       scope_id: 1
//!       member: { user: { id: 5, name: alice } }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use herald_audit::{
    ActionKind, AuditEntry, Clock, Directory, DirectoryCall, DirectoryError, Dispatcher, Identity,
    Invite, LogSink, ManualClock, Notification, ScopeId, StaticDirectory, TimeoutDirectory,
    VanityInvite, create_sink,
};
use herald_core::HeraldConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Script Format
// ============================================================================

/// A replay script.
#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// One replay step.
#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Replace the invite listing of a scope.
    SetInvites {
        scope: ScopeId,
        #[serde(default)]
        invites: Vec<Invite>,
    },

    /// Set or clear the vanity code of a scope.
    SetVanity {
        scope: ScopeId,
        #[serde(default)]
        code: Option<String>,
    },

    /// Append an audit entry, created `age_secs` before the replay clock.
    PushAuditEntry {
        scope: ScopeId,
        action: ActionKind,
        #[serde(default)]
        target_id: Option<u64>,
        #[serde(default)]
        actor: Option<Identity>,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        age_secs: u64,
    },

    /// Move the replay clock forward.
    Advance { secs: u64 },

    /// Make a directory call fail for a scope until recovered.
    Fail {
        scope: ScopeId,
        call: ScriptCall,
        error: ScriptError,
        #[serde(default)]
        message: Option<String>,
    },

    Recover { scope: ScopeId, call: ScriptCall },

    /// Deliver a notification to the dispatcher.
    Notify { notification: Notification },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptCall {
    ListInvites,
    VanityInvite,
    AuditEntries,
}

impl From<ScriptCall> for DirectoryCall {
    fn from(call: ScriptCall) -> Self {
        match call {
            ScriptCall::ListInvites => DirectoryCall::ListInvites,
            ScriptCall::VanityInvite => DirectoryCall::VanityInvite,
            ScriptCall::AuditEntries => DirectoryCall::AuditEntries,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptError {
    PermissionDenied,
    Timeout,
    NotFound,
    MalformedResponse,
    Unavailable,
}

impl ScriptError {
    fn into_directory_error(self, message: Option<String>) -> DirectoryError {
        let message = message.unwrap_or_else(|| "injected by replay".to_string());
        match self {
            Self::PermissionDenied => DirectoryError::PermissionDenied,
            Self::Timeout => DirectoryError::Timeout,
            Self::NotFound => DirectoryError::NotFound,
            Self::MalformedResponse => DirectoryError::MalformedResponse(message),
            Self::Unavailable => DirectoryError::Unavailable(message),
        }
    }
}

// ============================================================================
// Replay Runtime
// ============================================================================

/// Outcome of a replay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub steps: usize,
    pub notifications: usize,
    pub records: usize,
}

/// Dispatcher wired to an in-memory directory and a manual clock.
pub struct Replay {
    clock: Arc<ManualClock>,
    directory: Arc<TimeoutDirectory<StaticDirectory>>,
    dispatcher: Dispatcher,
}

impl Replay {
    pub fn new(config: &HeraldConfig, sink: Arc<dyn LogSink>, start: DateTime<Utc>) -> Self {
        let clock = Arc::new(ManualClock::new(start));
        let directory = Arc::new(TimeoutDirectory::new(
            StaticDirectory::new(),
            config.attribution.directory_timeout(),
        ));
        let dispatcher = Dispatcher::new(
            config,
            directory.clone() as Arc<dyn Directory>,
            sink,
            clock.clone() as Arc<dyn Clock>,
        );
        Self {
            clock,
            directory,
            dispatcher,
        }
    }

    fn state(&self) -> &StaticDirectory {
        self.directory.inner()
    }

    /// Apply one step, returning the number of records it delivered.
    pub async fn apply(&self, step: Step) -> Result<usize> {
        match step {
            Step::SetInvites { scope, invites } => self.state().set_invites(scope, invites),
            Step::SetVanity { scope, code } => self
                .state()
                .set_vanity(scope, code.map(|c| VanityInvite { code: Some(c) })),
            Step::PushAuditEntry {
                scope,
                action,
                target_id,
                actor,
                reason,
                age_secs,
            } => {
                let created_at = self
                    .clock
                    .now()
                    .checked_sub_signed(seconds(age_secs)?)
                    .with_context(|| format!("age_secs {} is out of range", age_secs))?;
                self.state().push_audit_entry(
                    scope,
                    AuditEntry {
                        action,
                        target_id,
                        actor,
                        reason,
                        created_at,
                    },
                );
            }
            Step::Advance { secs } => {
                let by = seconds(secs)?;
                self.clock
                    .now()
                    .checked_add_signed(by)
                    .with_context(|| format!("advancing by {}s is out of range", secs))?;
                self.clock.advance(by);
            }
            Step::Fail {
                scope,
                call,
                error,
                message,
            } => self
                .state()
                .fail(scope, call.into(), error.into_directory_error(message)),
            Step::Recover { scope, call } => self.state().recover(scope, call.into()),
            Step::Notify { notification } => {
                return Ok(self.dispatcher.dispatch(notification).await);
            }
        }
        Ok(0)
    }

    /// Run every step of a script in order, stopping at the first invalid step.
    pub async fn run(&self, script: Script) -> Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        for (index, step) in script.steps.into_iter().enumerate() {
            if matches!(step, Step::Notify { .. }) {
                summary.notifications += 1;
            }
            summary.records += self
                .apply(step)
                .await
                .with_context(|| format!("Replay step {} failed", index + 1))?;
            summary.steps += 1;
        }
        Ok(summary)
    }
}

fn seconds(secs: u64) -> Result<Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .with_context(|| format!("{} seconds is out of range", secs))
}

/// Replay a script against the configured sink.
pub async fn run(config_path: &Path, script_path: &Path) -> Result<()> {
    let config = HeraldConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    let script = Script::from_file(script_path)?;
    let sink = create_sink(&config.sink).context("Failed to create log sink")?;

    let replay = Replay::new(&config, sink, Utc::now());
    let summary = replay.run(script).await?;

    info!(
        steps = summary.steps,
        notifications = summary.notifications,
        records = summary.records,
        "Replay finished"
    );

    Ok(())
}
