// Configuration types shared across all Herald crates
pub mod config;

// Re-export commonly used config types for convenience
pub use config::{
    AttributionConfig, CategoryToggles, ConfigError, HeraldConfig, LoggingConfig, RecordsConfig,
    SinkBackend, SinkConfig, ToggleOverrides, WindowsConfig,
};
