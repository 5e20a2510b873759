//! This module defines the interface for fetching snapshots of watched
//! entities from an external provider.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::{
    http_client::HttpClientPoolError,
    models::{Entity, EntityKey},
};

/// Custom error type for snapshot source operations. Every variant is a
/// fetch failure and is treated as transient by the runner.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The configured URL could not be parsed.
    #[error("Invalid source URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The request could not be sent or no response arrived.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// The response body could not be read.
    #[error("Failed to read response: {0}")]
    Body(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Unexpected HTTP status {status} from {url}")]
    Status {
        /// The status code received.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// The response did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// No HTTP client could be obtained.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] HttpClientPoolError),
}

/// A source of snapshots: the complete current set of entities of one
/// provider.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches the complete current snapshot. Partial or malformed input is
    /// an error, never a shorter snapshot.
    async fn fetch_snapshot(&self) -> Result<Vec<Entity>, SourceError>;

    /// Fetches the current details of a single entity, or `None` if the
    /// provider does not know it.
    async fn fetch_entity(&self, key: &EntityKey) -> Result<Option<Entity>, SourceError> {
        Ok(self.fetch_snapshot().await?.into_iter().find(|entity| &entity.key == key))
    }
}
