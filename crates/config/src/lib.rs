//! Typed configuration for the assistant backend.
//!
//! Loads from a YAML/TOML file plus environment variable overrides (§6). Every field
//! has a programmatic default, so `Settings::default()` is always a valid configuration
//! even with no file and no environment present.

pub mod settings;

pub use settings::{
    load_settings, AuthSettings, CircuitBreakerSettings, ConfigError, DatabaseSettings,
    LlmSettings, MemorySettings, ProviderReliabilitySettings, ReliabilitySettings,
    RetrySettings, SearchSettings, Settings, StyleSettings,
};
