//! Typed application settings, loaded from a config file plus environment overrides.
//!
//! Every field carries a programmatic default so `Settings::default()` — and therefore
//! `load_settings(None)` against an empty environment — is always a valid configuration.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// LLM provider settings (§6: `generate(messages, temperature?, max_tokens?, extra?)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_llm_timeout_s")]
    pub timeout_s: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: String::new(),
            model: default_llm_model(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: None,
            timeout_s: default_llm_timeout_s(),
        }
    }
}

fn default_llm_provider() -> String {
    "claude".to_string()
}
fn default_llm_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout_s() -> u64 {
    30
}

/// Web-search provider settings (§6 MCP-over-HTTP variant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_search_timeout_s")]
    pub timeout_s: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            endpoint: default_search_endpoint(),
            max_results: default_max_results(),
            timeout_s: default_search_timeout_s(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://mcp.search.local".to_string()
}
fn default_max_results() -> u32 {
    5
}
fn default_search_timeout_s() -> u64 {
    15
}

impl SearchSettings {
    /// `max_results` is clamped into the `[1, 50]` range the `SearchRequest`
    /// constructor itself enforces; settings loading never panics on an out-of-range
    /// file value, it just clamps.
    pub fn clamped_max_results(&self) -> u32 {
        self.max_results.clamp(1, 50)
    }
}

/// Memory subsystem settings (§4.6 / §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    #[serde(default = "default_short_term_max_messages")]
    pub short_term_max_messages: usize,
    #[serde(default = "default_short_term_session_timeout_s")]
    pub short_term_session_timeout_s: u64,
    #[serde(default = "default_true")]
    pub long_term_enabled: bool,
    #[serde(default = "default_true")]
    pub long_term_extraction_enabled: bool,
    #[serde(default = "default_confidence_threshold")]
    pub long_term_confidence_threshold: f32,
    #[serde(default = "default_cleanup_days")]
    pub cleanup_days: u32,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            short_term_max_messages: default_short_term_max_messages(),
            short_term_session_timeout_s: default_short_term_session_timeout_s(),
            long_term_enabled: true,
            long_term_extraction_enabled: true,
            long_term_confidence_threshold: default_confidence_threshold(),
            cleanup_days: default_cleanup_days(),
        }
    }
}

fn default_short_term_max_messages() -> usize {
    20
}
fn default_short_term_session_timeout_s() -> u64 {
    1800
}
fn default_confidence_threshold() -> f32 {
    0.7
}
fn default_cleanup_days() -> u32 {
    90
}
fn default_true() -> bool {
    true
}

impl MemorySettings {
    pub fn clamped_confidence_threshold(&self) -> f32 {
        self.long_term_confidence_threshold.clamp(0.0, 1.0)
    }
}

/// Authorization gating settings — the predicate itself is out of scope, this is just
/// the configuration it is consulted against.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub admin_ids: Vec<i64>,
    #[serde(default = "default_admin_port")]
    pub admin_port: u16,
    #[serde(default)]
    pub admin_enabled: bool,
}

fn default_admin_port() -> u16 {
    8090
}

/// Database (wide-column store) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_db_name")]
    pub name: String,
    #[serde(default = "default_min_pool_size")]
    pub min_pool_size: u32,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    #[serde(default = "default_connection_timeout_s")]
    pub connection_timeout_s: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: String::new(),
            password: String::new(),
            name: default_db_name(),
            min_pool_size: default_min_pool_size(),
            max_pool_size: default_max_pool_size(),
            connection_timeout_s: default_connection_timeout_s(),
        }
    }
}

fn default_db_host() -> String {
    "127.0.0.1".to_string()
}
fn default_db_port() -> u16 {
    9042
}
fn default_db_name() -> String {
    "assistant".to_string()
}
fn default_min_pool_size() -> u32 {
    1
}
fn default_max_pool_size() -> u32 {
    10
}
fn default_connection_timeout_s() -> u64 {
    10
}

impl DatabaseSettings {
    /// Comma-separated `host:port` pair list the Scylla session builder expects.
    pub fn known_node(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Selects the system-prompt template rendered by `nexus_core::style`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSettings {
    #[serde(default = "default_style_tag")]
    pub tag: String,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self { tag: default_style_tag() }
    }
}

fn default_style_tag() -> String {
    "neutral".to_string()
}

/// Circuit breaker tuning (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_timeout_s")]
    pub recovery_timeout_s: u64,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_s: default_recovery_timeout_s(),
            success_threshold: default_success_threshold(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}
fn default_recovery_timeout_s() -> u64 {
    30
}
fn default_success_threshold() -> u32 {
    3
}

/// Retry-with-backoff tuning (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    250
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_jitter_ms() -> u64 {
    100
}

/// Paired circuit-breaker + retry configuration for one external-provider family.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderReliabilitySettings {
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// One reliability configuration per external-provider family, independently
/// configurable (§6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReliabilitySettings {
    #[serde(default)]
    pub llm: ProviderReliabilitySettings,
    #[serde(default)]
    pub search: ProviderReliabilitySettings,
}

/// Top-level settings, aggregating every recognized configuration group.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub style: StyleSettings,
    #[serde(default)]
    pub reliability: ReliabilitySettings,
}

impl Settings {
    /// Cross-field validation that a deserialized `Settings` could violate but the
    /// `Default` impl cannot (every default is already in-range).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.long_term_confidence_threshold < 0.0
            || self.memory.long_term_confidence_threshold > 1.0
        {
            return Err(ConfigError::InvalidValue {
                field: "memory.long_term_confidence_threshold",
                message: "must be within [0, 1]".to_string(),
            });
        }
        if self.search.max_results < 1 || self.search.max_results > 50 {
            return Err(ConfigError::InvalidValue {
                field: "search.max_results",
                message: "must be within [1, 50]".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads settings from `config/default.{yaml,toml}`, an optional `config/{env}` overlay,
/// and `ASSISTANT__`-prefixed environment variables (double underscore as the nesting
/// separator, e.g. `ASSISTANT__LLM__API_KEY`), in that precedence order.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("ASSISTANT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_validate() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn default_settings_have_sane_values() {
        let s = Settings::default();
        assert_eq!(s.llm.provider, "claude");
        assert_eq!(s.search.max_results, 5);
        assert!(s.memory.long_term_enabled);
        assert_eq!(s.database.port, 9042);
        assert_eq!(s.reliability.llm.circuit_breaker.failure_threshold, 5);
    }

    #[test]
    fn validate_rejects_out_of_range_confidence() {
        let mut s = Settings::default();
        s.memory.long_term_confidence_threshold = 1.5;
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_max_results() {
        let mut s = Settings::default();
        s.search.max_results = 0;
        assert!(s.validate().is_err());
        s.search.max_results = 51;
        assert!(s.validate().is_err());
    }

    #[test]
    fn load_settings_with_no_files_and_no_env_falls_back_to_defaults() {
        let settings = load_settings(None).expect("defaults alone must load");
        assert_eq!(settings.llm.model, "claude-sonnet-4-20250514");
    }
}
