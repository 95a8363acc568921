pub mod validation;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Remote inference endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default)]
    pub http_use_env_proxy: bool,
    #[serde(default)]
    pub proxy: Option<String>,
}

fn default_timeout() -> u64 {
    180
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}

impl EndpointConfig {
    /// Endpoint config with defaults for everything but the URL and key.
    #[must_use]
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            http_use_env_proxy: false,
            proxy: None,
        }
    }

    #[must_use]
    pub fn pool_idle_timeout(&self) -> Option<Duration> {
        if self.http_pool_idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.http_pool_idle_timeout_secs))
        }
    }
}

/// Chat session behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
    #[serde(default = "default_max_frame_retries")]
    pub max_frame_retries: u32,
    #[serde(default)]
    pub stream_idle_timeout_secs: Option<u64>,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}
fn default_max_frame_retries() -> u32 {
    16
}

impl ChatConfig {
    #[must_use]
    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_system_prompt: default_system_prompt(),
            max_frame_retries: default_max_frame_retries(),
            stream_idle_timeout_secs: None,
        }
    }
}

/// Local persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Identity handed out by the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_user_id() -> String {
    "local-user".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] when parsing fails or
/// [`ConfigError::Validation`] when semantic validation fails.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_example_config() {
        let config = load_config("config.example.yaml");
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert!(config.endpoint.url.ends_with("/functions/v1/bot-chat"));
        assert_eq!(config.endpoint.timeout, 180);
        assert_eq!(config.chat.max_frame_retries, 16);
        assert!(config.chat.stream_idle_timeout_secs.is_none());
        assert_eq!(config.features.log_level, "INFO");
        assert_eq!(config.features.log_format, "text");
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse_config(
            "endpoint:\n  url: http://127.0.0.1:9000/bot-chat\n  api_key: key\n",
        )
        .unwrap();
        assert_eq!(config.endpoint.http_pool_max_idle_per_host, 16);
        assert_eq!(
            config.endpoint.pool_idle_timeout(),
            Some(Duration::from_secs(15))
        );
        assert_eq!(
            config.chat.default_system_prompt,
            "You are a helpful assistant."
        );
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert_eq!(config.identity.user_id, "local-user");
        assert!(config.chat.stream_idle_timeout().is_none());
    }

    #[test]
    fn test_zero_idle_timeout_disables_pool_timeout() {
        let mut endpoint = EndpointConfig::new("http://localhost/x", "k");
        endpoint.http_pool_idle_timeout_secs = 0;
        assert!(endpoint.pool_idle_timeout().is_none());
    }

    #[test]
    fn test_missing_endpoint_is_yaml_error() {
        let err = parse_config("chat:\n  max_frame_retries: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
