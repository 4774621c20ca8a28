//! `herald check` command implementation.

use anyhow::{Context, Result};
use herald_core::{CategoryToggles, HeraldConfig, SinkBackend};
use std::path::Path;

// ============================================================================
// Summary
// ============================================================================

/// Names of the categories switched off in a toggle set.
fn disabled_categories(toggles: &CategoryToggles) -> Vec<&'static str> {
    [
        ("member_join", toggles.member_join),
        ("invites", toggles.invites),
        ("kick", toggles.kick),
        ("ban", toggles.ban),
        ("roles", toggles.roles),
        ("nickname", toggles.nickname),
        ("timeout", toggles.timeout),
        ("message_delete", toggles.message_delete),
        ("message_edit", toggles.message_edit),
    ]
    .into_iter()
    .filter(|(_, enabled)| !enabled)
    .map(|(name, _)| name)
    .collect()
}

fn describe_sink(config: &HeraldConfig) -> String {
    match config.sink.backend {
        SinkBackend::Console => "console".to_string(),
        SinkBackend::File => format!("file ({})", config.sink.file_path),
        SinkBackend::Null => "null".to_string(),
    }
}

/// Render a validated configuration as report lines.
pub fn summarize(config: &HeraldConfig) -> Vec<String> {
    let attribution = &config.attribution;
    let windows = attribution.windows;
    let mut lines = vec![
        format!("audit lookback:      {} entries", attribution.audit_lookback),
        format!("directory timeout:   {} ms", attribution.directory_timeout_ms),
        format!(
            "recency windows:     kick {}s, ban {}s, role update {}s, member update {}s",
            windows.kick, windows.ban, windows.role_update, windows.member_update
        ),
        format!(
            "content budgets:     delete {} chars, edit {} chars",
            config.records.delete_content_chars, config.records.edit_content_chars
        ),
        format!("sink:                {}", describe_sink(config)),
    ];

    let disabled = disabled_categories(&config.logging.defaults);
    if disabled.is_empty() {
        lines.push("disabled categories: none".to_string());
    } else {
        lines.push(format!("disabled categories: {}", disabled.join(", ")));
    }

    for scope_id in config.logging.scopes.keys() {
        let effective = disabled_categories(&config.logging.effective(*scope_id));
        let rendered = if effective.is_empty() {
            "none".to_string()
        } else {
            effective.join(", ")
        };
        lines.push(format!("  scope {}: disabled {}", scope_id, rendered));
    }

    lines
}

// ============================================================================
// Main Check Runner
// ============================================================================

/// Load and validate the configuration, then print a summary.
pub fn run(config_path: &Path) -> Result<()> {
    println!("Checking Herald configuration at {}", config_path.display());
    println!();

    let config = HeraldConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    for line in summarize(&config) {
        println!("  {}", line);
    }

    println!();
    println!("{}", "=".repeat(60));
    println!("Configuration is valid.");

    Ok(())
}
