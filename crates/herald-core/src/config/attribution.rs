//! Attribution engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for invite and audit trail attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionConfig {
    /// How many recent audit entries to request per correlation query.
    #[serde(default = "default_audit_lookback")]
    pub audit_lookback: usize,

    /// Upper bound for any single directory call, in milliseconds.
    #[serde(default = "default_directory_timeout_ms")]
    pub directory_timeout_ms: u64,

    /// Recency windows per action kind.
    #[serde(default)]
    pub windows: WindowsConfig,
}

impl AttributionConfig {
    /// Directory call timeout as a `Duration`.
    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory_timeout_ms)
    }
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            audit_lookback: default_audit_lookback(),
            directory_timeout_ms: default_directory_timeout_ms(),
            windows: WindowsConfig::default(),
        }
    }
}

/// Recency windows, in seconds, used when correlating audit entries.
///
/// Kick and ban entries are written almost immediately, while role and
/// member updates land in a broader log and tend to lag further behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowsConfig {
    #[serde(default = "default_short_window")]
    pub kick: u64,

    #[serde(default = "default_short_window")]
    pub ban: u64,

    #[serde(default = "default_long_window")]
    pub role_update: u64,

    #[serde(default = "default_long_window")]
    pub member_update: u64,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            kick: default_short_window(),
            ban: default_short_window(),
            role_update: default_long_window(),
            member_update: default_long_window(),
        }
    }
}

fn default_audit_lookback() -> usize {
    10
}

fn default_directory_timeout_ms() -> u64 {
    5000
}

fn default_short_window() -> u64 {
    20
}

fn default_long_window() -> u64 {
    25
}
