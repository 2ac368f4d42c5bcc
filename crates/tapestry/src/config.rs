//! TOML configuration for the tapestry binary.
//!
//! The file names the platform API base URL and the environment variable
//! carrying its token; the webhook section tunes the dispatcher and may be
//! omitted entirely.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tapestry_error::ConfigError;
use tapestry_webhook::DispatcherConfig;

/// Top-level configuration.
///
/// # Example
///
/// ```toml
/// [platform]
/// base_url = "https://chat.example.com/api"
/// token_env = "TAPESTRY_PLATFORM_TOKEN"
///
/// [webhook]
/// max_attempts = 5
/// base_delay_secs = 1
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TapestryConfig {
    /// Platform API connection settings.
    pub platform: PlatformConfig,
    /// Webhook dispatcher tuning.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Platform API connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the platform's REST API.
    pub base_url: String,
    /// Name of the environment variable holding the API token. The token
    /// itself never lives in the config file.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "TAPESTRY_PLATFORM_TOKEN".to_string()
}

/// Webhook dispatcher tuning. Defaults match the delivery contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Send attempts per notification before dead-lettering.
    pub max_attempts: u32,
    /// Seconds before the first retry; doubles per attempt.
    pub base_delay_secs: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Consecutive dead-lettered notifications before suspension.
    pub failure_threshold: i32,
    /// Maximum concurrent in-flight deliveries.
    pub max_in_flight: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        let defaults = DispatcherConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_secs: defaults.base_delay.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            failure_threshold: defaults.failure_threshold,
            max_in_flight: defaults.max_in_flight,
        }
    }
}

impl WebhookConfig {
    /// Convert into the dispatcher's runtime configuration.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs(self.base_delay_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            failure_threshold: self.failure_threshold,
            max_in_flight: self.max_in_flight,
        }
    }
}

impl TapestryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("could not read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| ConfigError::new(format!("could not parse {}: {e}", path.display())))
    }

    /// Resolve the platform API token from the configured environment
    /// variable.
    pub fn token(&self) -> Result<String, ConfigError> {
        std::env::var(&self.platform.token_env).map_err(|_| {
            ConfigError::new(format!(
                "environment variable {} is not set",
                self.platform.token_env
            ))
        })
    }
}
