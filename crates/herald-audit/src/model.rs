//! Domain model: identities, invites, audit entries and the notifications
//! delivered by the surrounding event layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of a scope (one collaboration server).
pub type ScopeId = u64;

/// Id of a user account.
pub type UserId = u64;

/// A user account as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    /// Automated (bot) account.
    #[serde(default)]
    pub bot: bool,
}

impl Identity {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bot: false,
        }
    }

    pub fn bot(id: UserId, name: impl Into<String>) -> Self {
        Self {
            bot: true,
            ..Self::new(id, name)
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (`{}`)", self.name, self.id)
    }
}

/// A role that can be granted to members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub name: String,
}

impl Role {
    /// Name of the implicit role every member holds.
    pub const EVERYONE: &'static str = "@everyone";

    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn is_everyone(&self) -> bool {
        self.name == Self::EVERYONE
    }
}

/// Member state at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: Identity,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// End of the member's current timeout, if any.
    #[serde(default)]
    pub timed_out_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub account_created: Option<DateTime<Utc>>,
}

impl Member {
    pub fn new(user: Identity) -> Self {
        Self {
            user,
            nick: None,
            roles: Vec::new(),
            timed_out_until: None,
            account_created: None,
        }
    }

    /// Nickname, falling back to the account name.
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.user.name)
    }
}

/// A chat message as delivered with delete/edit notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    /// Scope the message belongs to; `None` for direct messages.
    #[serde(default)]
    pub scope_id: Option<ScopeId>,
    pub channel_id: u64,
    #[serde(default)]
    pub author: Option<Identity>,
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn from_automated_author(&self) -> bool {
        self.author.as_ref().is_some_and(|a| a.bot)
    }
}

/// One entry of a scope's invite listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub code: String,
    #[serde(default)]
    pub uses: u64,
    #[serde(default)]
    pub inviter: Option<Identity>,
}

impl Invite {
    pub fn new(code: impl Into<String>, uses: u64) -> Self {
        Self {
            code: code.into(),
            uses,
            inviter: None,
        }
    }

    pub fn with_inviter(mut self, inviter: Identity) -> Self {
        self.inviter = Some(inviter);
        self
    }
}

/// A scope's custom, non-expiring entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VanityInvite {
    #[serde(default)]
    pub code: Option<String>,
}

/// Kinds of administrative action the audit trail records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Kick,
    Ban,
    MemberRoleUpdate,
    MemberUpdate,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kick => write!(f, "kick"),
            Self::Ban => write!(f, "ban"),
            Self::MemberRoleUpdate => write!(f, "member_role_update"),
            Self::MemberUpdate => write!(f, "member_update"),
        }
    }
}

/// One entry of the external audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: ActionKind,
    /// Id of the subject the action was applied to.
    #[serde(default)]
    pub target_id: Option<UserId>,
    /// Who performed the action.
    #[serde(default)]
    pub actor: Option<Identity>,
    #[serde(default)]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle notifications consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// The engine connected; `scopes` lists every scope it is already in.
    Ready { scopes: Vec<ScopeId> },
    ScopeJoined { scope_id: ScopeId },
    ScopeLeft { scope_id: ScopeId },
    InviteCreated {
        #[serde(default)]
        scope_id: Option<ScopeId>,
        code: String,
    },
    InviteDeleted {
        #[serde(default)]
        scope_id: Option<ScopeId>,
        code: String,
    },
    MemberJoined { scope_id: ScopeId, member: Member },
    MemberRemoved { scope_id: ScopeId, member: Member },
    MemberBanned { scope_id: ScopeId, user: Identity },
    MemberUpdated {
        scope_id: ScopeId,
        before: Member,
        after: Member,
    },
    MessageDeleted { message: Message },
    MessageEdited { before: Message, after: Message },
}

impl Notification {
    /// Short name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::ScopeJoined { .. } => "scope_joined",
            Self::ScopeLeft { .. } => "scope_left",
            Self::InviteCreated { .. } => "invite_created",
            Self::InviteDeleted { .. } => "invite_deleted",
            Self::MemberJoined { .. } => "member_joined",
            Self::MemberRemoved { .. } => "member_removed",
            Self::MemberBanned { .. } => "member_banned",
            Self::MemberUpdated { .. } => "member_updated",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::MessageEdited { .. } => "message_edited",
        }
    }
}
