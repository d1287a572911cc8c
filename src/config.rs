//! Configuration system for the vacancy broker
//!
//! Loaded from a TOML file. Every section has defaults, so an empty file
//! yields a working broker pointed at the public hh.ru API.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Main broker configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BrokerConfig {
    #[serde(default)]
    pub broker: BrokerSection,
    #[serde(default)]
    pub dispatcher: DispatcherSection,
    #[serde(default)]
    pub results: ResultsSection,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub health: HealthSection,
}

/// Broker identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokerSection {
    /// Broker identifier (must match [a-zA-Z0-9._-]+)
    #[serde(default = "default_broker_id")]
    pub id: String,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            id: default_broker_id(),
        }
    }
}

/// Worker pool and rendezvous settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatcherSection {
    /// Number of concurrent workers draining the task queue
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// How long `handle_request` waits for a result
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Interval between result store polls while waiting
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Result store eviction settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultsSection {
    /// Unclaimed results older than `ttl_multiplier * request_timeout` are evicted
    #[serde(default = "default_ttl_multiplier")]
    pub ttl_multiplier: u32,
    /// Seconds between eviction passes
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,
}

impl Default for ResultsSection {
    fn default() -> Self {
        Self {
            ttl_multiplier: default_ttl_multiplier(),
            eviction_interval_secs: default_eviction_interval_secs(),
        }
    }
}

/// Upstream vacancy API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Page size requested from the upstream API
    #[serde(default = "default_max_vacancies")]
    pub max_vacancies: u32,
    /// Upstream area filter (1 = Moscow)
    #[serde(default = "default_area")]
    pub area: u32,
    #[serde(default = "default_source_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            max_vacancies: default_max_vacancies(),
            area: default_area(),
            request_timeout_secs: default_source_timeout_secs(),
        }
    }
}

/// Status server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSection {
    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            port: default_health_port(),
        }
    }
}

fn default_broker_id() -> String {
    "vacancy-broker".to_string()
}

fn default_pool_size() -> usize {
    3
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_ttl_multiplier() -> u32 {
    4
}

fn default_eviction_interval_secs() -> u64 {
    30
}

fn default_api_url() -> String {
    "https://api.hh.ru/vacancies".to_string()
}

fn default_user_agent() -> String {
    concat!("vacancy-broker/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_vacancies() -> u32 {
    5
}

fn default_area() -> u32 {
    1
}

fn default_source_timeout_secs() -> u64 {
    30
}

fn default_health_port() -> u16 {
    8080
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid broker ID format: {0}")]
    InvalidBrokerId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BrokerConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: BrokerConfig = toml::from_str(content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and formats
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_broker_id(&self.broker.id)?;

        if self.dispatcher.pool_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "dispatcher.pool_size must be at least 1".to_string(),
            ));
        }
        if self.dispatcher.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "dispatcher.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.dispatcher.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "dispatcher.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.results.ttl_multiplier == 0 {
            return Err(ConfigError::InvalidConfig(
                "results.ttl_multiplier must be at least 1".to_string(),
            ));
        }
        if self
            .request_timeout()
            .checked_mul(self.results.ttl_multiplier)
            .is_none()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "results.ttl_multiplier * dispatcher.request_timeout_secs overflows ({} * {}s)",
                self.results.ttl_multiplier, self.dispatcher.request_timeout_secs
            )));
        }
        if self.results.eviction_interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "results.eviction_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.source.max_vacancies == 0 {
            return Err(ConfigError::InvalidConfig(
                "source.max_vacancies must be at least 1".to_string(),
            ));
        }

        validate_api_url(&self.source.api_url)
    }

    /// `HEALTH_PORT` takes precedence over the file
    fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("HEALTH_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            self.health.port = port;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatcher.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.dispatcher.poll_interval_ms)
    }

    /// Age after which an unclaimed result is evicted
    pub fn result_ttl(&self) -> Duration {
        self.request_timeout()
            .saturating_mul(self.results.ttl_multiplier)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.results.eviction_interval_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source.request_timeout_secs)
    }

    /// Create a test configuration with short timings
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[broker]
id = "test-broker"

[dispatcher]
pool_size = 2
request_timeout_secs = 2
poll_interval_ms = 10

[results]
ttl_multiplier = 1
eviction_interval_secs = 1
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

/// Validate broker ID format
fn validate_broker_id(broker_id: &str) -> Result<(), ConfigError> {
    let valid_chars = broker_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if broker_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidBrokerId(format!(
            "Broker ID '{broker_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}

fn validate_api_url(api_url: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(api_url).map_err(|e| {
        ConfigError::InvalidConfig(format!("source.api_url '{api_url}' is not a valid URL: {e}"))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidConfig(format!(
            "source.api_url must use http or https, got '{scheme}'"
        ))),
    }
}
