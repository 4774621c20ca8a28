//! Per-category logging toggles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logging configuration: global toggles plus per-scope overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Toggles applied to every scope unless overridden.
    #[serde(default)]
    pub defaults: CategoryToggles,

    /// Overrides keyed by scope id.
    #[serde(default)]
    pub scopes: BTreeMap<u64, ToggleOverrides>,
}

impl LoggingConfig {
    /// Resolve the effective toggles for a scope.
    pub fn effective(&self, scope_id: u64) -> CategoryToggles {
        match self.scopes.get(&scope_id) {
            Some(overrides) => overrides.apply(self.defaults),
            None => self.defaults,
        }
    }
}

/// Which record categories are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryToggles {
    /// Member join and leave records.
    #[serde(default = "default_true")]
    pub member_join: bool,

    /// Invite attribution on join records.
    #[serde(default = "default_true")]
    pub invites: bool,

    #[serde(default = "default_true")]
    pub kick: bool,

    #[serde(default = "default_true")]
    pub ban: bool,

    #[serde(default = "default_true")]
    pub roles: bool,

    #[serde(default = "default_true")]
    pub nickname: bool,

    #[serde(default = "default_true")]
    pub timeout: bool,

    #[serde(default = "default_true")]
    pub message_delete: bool,

    #[serde(default = "default_true")]
    pub message_edit: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            member_join: true,
            invites: true,
            kick: true,
            ban: true,
            roles: true,
            nickname: true,
            timeout: true,
            message_delete: true,
            message_edit: true,
        }
    }
}

/// Partial toggles for a single scope. Unset fields inherit the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOverrides {
    #[serde(default)]
    pub member_join: Option<bool>,
    #[serde(default)]
    pub invites: Option<bool>,
    #[serde(default)]
    pub kick: Option<bool>,
    #[serde(default)]
    pub ban: Option<bool>,
    #[serde(default)]
    pub roles: Option<bool>,
    #[serde(default)]
    pub nickname: Option<bool>,
    #[serde(default)]
    pub timeout: Option<bool>,
    #[serde(default)]
    pub message_delete: Option<bool>,
    #[serde(default)]
    pub message_edit: Option<bool>,
}

impl ToggleOverrides {
    /// Layer these overrides on top of `base`.
    pub fn apply(&self, base: CategoryToggles) -> CategoryToggles {
        CategoryToggles {
            member_join: self.member_join.unwrap_or(base.member_join),
            invites: self.invites.unwrap_or(base.invites),
            kick: self.kick.unwrap_or(base.kick),
            ban: self.ban.unwrap_or(base.ban),
            roles: self.roles.unwrap_or(base.roles),
            nickname: self.nickname.unwrap_or(base.nickname),
            timeout: self.timeout.unwrap_or(base.timeout),
            message_delete: self.message_delete.unwrap_or(base.message_delete),
            message_edit: self.message_edit.unwrap_or(base.message_edit),
        }
    }
}

fn default_true() -> bool {
    true
}
