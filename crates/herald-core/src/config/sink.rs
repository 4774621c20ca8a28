//! Log sink configuration.

use serde::{Deserialize, Serialize};

/// Where emitted log records are delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink backend type.
    #[serde(default)]
    pub backend: SinkBackend,

    /// File path (for file backend).
    #[serde(default = "default_file_path")]
    pub file_path: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            backend: SinkBackend::default(),
            file_path: default_file_path(),
        }
    }
}

/// Sink backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkBackend {
    /// Human-readable lines on stdout.
    #[default]
    Console,
    /// JSON Lines appended to a file.
    File,
    /// Discard everything.
    Null,
}

fn default_file_path() -> String {
    "herald-records.jsonl".to_string()
}
