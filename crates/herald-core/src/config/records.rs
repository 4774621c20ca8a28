//! Record shaping configuration.

use serde::{Deserialize, Serialize};

/// Limits applied to free-text content copied into log records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// Character budget for the content of a deleted message.
    #[serde(default = "default_delete_content_chars")]
    pub delete_content_chars: usize,

    /// Character budget for each of the before/after copies of an edited message.
    #[serde(default = "default_edit_content_chars")]
    pub edit_content_chars: usize,

    /// Placeholder used when a message has no text.
    #[serde(default = "default_empty_placeholder")]
    pub empty_content_placeholder: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            delete_content_chars: default_delete_content_chars(),
            edit_content_chars: default_edit_content_chars(),
            empty_content_placeholder: default_empty_placeholder(),
        }
    }
}

fn default_delete_content_chars() -> usize {
    1500
}

fn default_edit_content_chars() -> usize {
    900
}

fn default_empty_placeholder() -> String {
    "*no text*".to_string()
}
