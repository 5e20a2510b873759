//! Construction of the HTTP clients used by the sources and the email
//! notifier: a plain `reqwest::Client` carrying the shared connection
//! settings, wrapped in transient-error retry middleware.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{Jitter, RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{BaseHttpClientConfig, HttpRetryConfig, JitterSetting};

/// Builds the underlying client from the shared connection settings.
pub fn build_base_client(config: &BaseHttpClientConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if let Ok(agent) = HeaderValue::from_str(&config.user_agent) {
        headers.insert(USER_AGENT, agent);
    } else {
        tracing::warn!(
            user_agent = %config.user_agent,
            "Ignoring invalid User-Agent header value."
        );
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .pool_max_idle_per_host(config.max_idle_per_host)
        .pool_idle_timeout(Some(config.idle_timeout))
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()
}

/// Wraps `base_client` in an exponential backoff retry policy.
pub fn create_retryable_http_client(
    config: &HttpRetryConfig,
    base_client: reqwest::Client,
) -> ClientWithMiddleware {
    let jitter = match config.jitter {
        JitterSetting::None => Jitter::None,
        JitterSetting::Full => Jitter::Full,
    };

    let retry_policy = ExponentialBackoff::builder()
        .jitter(jitter)
        .retry_bounds(config.initial_backoff_ms, config.max_backoff_secs)
        .build_with_max_retries(config.max_retries);

    ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}
