//! A shared pool of retrying HTTP clients.
//!
//! Every client in the pool is built from the same `BaseHttpClientConfig`;
//! clients are distinguished only by their retry policy, so callers with the
//! same policy share connections.

use std::{collections::HashMap, sync::Arc};

use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;
use tokio::sync::RwLock;

use super::client::{build_base_client, create_retryable_http_client};
use crate::config::{BaseHttpClientConfig, HttpRetryConfig};

/// Errors that can occur within the `HttpClientPool`.
#[derive(Debug, Error)]
pub enum HttpClientPoolError {
    /// An error occurred while building the underlying `reqwest::Client`.
    #[error("Failed to create HTTP client: {0}")]
    HttpClientBuildError(String),
}

/// A pool of HTTP clients keyed by retry policy.
pub struct HttpClientPool {
    base_config: BaseHttpClientConfig,
    clients: RwLock<HashMap<HttpRetryConfig, Arc<ClientWithMiddleware>>>,
}

impl HttpClientPool {
    /// Creates an empty pool whose clients use `base_config`.
    pub fn new(base_config: BaseHttpClientConfig) -> Self {
        Self {
            base_config,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the client for `retry_policy`, creating it on first use.
    pub async fn get_or_create(
        &self,
        retry_policy: &HttpRetryConfig,
    ) -> Result<Arc<ClientWithMiddleware>, HttpClientPoolError> {
        if let Some(client) = self.clients.read().await.get(retry_policy) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        // Another task may have created it while we waited for the write lock.
        if let Some(client) = clients.get(retry_policy) {
            return Ok(client.clone());
        }

        let base_client = build_base_client(&self.base_config)
            .map_err(|e| HttpClientPoolError::HttpClientBuildError(e.to_string()))?;
        let client = Arc::new(create_retryable_http_client(retry_policy, base_client));
        clients.insert(retry_policy.clone(), client.clone());
        tracing::debug!(pool_size = clients.len(), "Created HTTP client.");

        Ok(client)
    }

    /// Returns the number of clients created so far.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for HttpClientPool {
    fn default() -> Self {
        Self::new(BaseHttpClientConfig::default())
    }
}
