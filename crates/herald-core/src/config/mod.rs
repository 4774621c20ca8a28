//! Configuration types for Herald.
//!
//! This module provides the unified configuration types used across all Herald crates.
//! Configuration is loaded from a single YAML file (herald.yaml). Every field has a
//! default, so an empty file yields a working configuration.
//!
//! # Sections
//!
//! - **attribution**: audit lookback, directory timeout and per-action recency windows
//! - **records**: truncation budgets for message content
//! - **logging**: which record categories are emitted, globally and per scope
//! - **sink**: where emitted records are delivered

pub mod attribution;
pub mod logging;
pub mod records;
pub mod sink;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use attribution::{AttributionConfig, WindowsConfig};
pub use logging::{CategoryToggles, LoggingConfig, ToggleOverrides};
pub use records::RecordsConfig;
pub use sink::{SinkBackend, SinkConfig};

/// Complete Herald configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    /// Attribution engine settings.
    #[serde(default)]
    pub attribution: AttributionConfig,

    /// Record shaping settings.
    #[serde(default)]
    pub records: RecordsConfig,

    /// Category toggles.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sink settings.
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl HeraldConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    ///
    /// Blank content is accepted and yields the defaults.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load, parse and validate in one step.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attribution.audit_lookback == 0 {
            return Err(ConfigError::Invalid(
                "attribution.audit_lookback must be at least 1".to_string(),
            ));
        }
        if self.attribution.directory_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "attribution.directory_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.records.delete_content_chars == 0 || self.records.edit_content_chars == 0 {
            return Err(ConfigError::Invalid(
                "records truncation budgets must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
