use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(500)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(10)
}

/// Whether randomness is added to request retry delays.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
    /// Delays follow the exponential curve exactly.
    None,
    /// Each delay is drawn uniformly below the exponential curve.
    #[default]
    Full,
}

/// Retry policy for individual HTTP requests made by the sources and the
/// email notifier. This sits below the runner's own attempt loop and only
/// smooths over transient transport failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct HttpRetryConfig {
    /// How many times a failed request is re-sent.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first re-send.
    #[serde(
        default = "default_initial_backoff",
        deserialize_with = "deserialize_duration_from_ms",
        serialize_with = "serialize_duration_to_ms"
    )]
    pub initial_backoff_ms: Duration,

    /// Upper bound for any single delay.
    #[serde(
        default = "default_max_backoff",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub max_backoff_secs: Duration,

    #[serde(default)]
    pub jitter: JitterSetting,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            jitter: JitterSetting::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: HttpRetryConfig = config::Config::builder()
            .add_source(config::File::from_str("max_retries: 5", config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.initial_backoff_ms, Duration::from_millis(500));
        assert_eq!(config.max_backoff_secs, Duration::from_secs(10));
        assert_eq!(config.jitter, JitterSetting::Full);
    }

    #[test]
    fn test_jitter_none_is_lowercase() {
        let config: HttpRetryConfig =
            serde_json::from_str(r#"{"jitter": "none", "initial_backoff_ms": 100}"#).unwrap();
        assert_eq!(config.jitter, JitterSetting::None);
        assert_eq!(config.initial_backoff_ms, Duration::from_millis(100));
    }
}
