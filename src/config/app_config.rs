use std::{collections::BTreeMap, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::{
    BaseHttpClientConfig, HttpRetryConfig, NotifierConfig, PollerConfig, RunnerConfig,
    ServerConfig, deserialize_duration_from_seconds,
};

fn default_database_url() -> String {
    "sqlite:data/pollwatch.db".to_string()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_delivery_log_limit() -> usize {
    500
}

/// Application configuration for pollwatch.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Database URL for the SQLite database.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Configuration for HTTP client retry policies.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,

    /// Configuration for the base HTTP client.
    #[serde(default)]
    pub http_base_config: BaseHttpClientConfig,

    /// Attempts and backoff of scheduled passes.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,

    /// How many delivery records are kept in the delivery log.
    #[serde(default = "default_delivery_log_limit")]
    pub delivery_log_limit: usize,

    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Pollers by name. The name prefixes every state document the poller
    /// writes.
    #[serde(default)]
    pub pollers: BTreeMap<String, PollerConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            server: ServerConfig::default(),
            http_retry_config: HttpRetryConfig::default(),
            http_base_config: BaseHttpClientConfig::default(),
            runner: RunnerConfig::default(),
            shutdown_timeout: default_shutdown_timeout(),
            delivery_log_limit: default_delivery_log_limit(),
            notifier: NotifierConfig::default(),
            pollers: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading `app.yaml` from the
    /// configuration directory, with `POLLWATCH__*` environment overrides.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = config_dir.unwrap_or("configs");
        Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir)))
            .add_source(Environment::with_prefix("POLLWATCH").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Looks a poller up by name.
    pub fn poller(&self, name: &str) -> Option<&PollerConfig> {
        self.pollers.get(name)
    }
}
