//! Snapshot sources and the rule tables that go with them.

use std::sync::Arc;

use crate::{
    config::{HttpRetryConfig, SourceConfig},
    engine::{RuleSet, RuleSetError},
    http_client::HttpClientPool,
};

pub mod ebay;
pub mod pool;
pub mod traits;

pub use ebay::EbayListingsSource;
pub use pool::PoolCalendarSource;
pub use traits::{SnapshotSource, SourceError};

/// Builds the snapshot source described by `config`, with an HTTP client
/// taken from the shared pool.
pub async fn build_source(
    config: &SourceConfig,
    http_pool: &HttpClientPool,
    retry_policy: &HttpRetryConfig,
) -> Result<Arc<dyn SnapshotSource>, SourceError> {
    let client = http_pool.get_or_create(retry_policy).await?;
    Ok(match config {
        SourceConfig::Ebay(ebay) => Arc::new(EbayListingsSource::new(client, ebay)?),
        SourceConfig::PoolCalendar(pool) => Arc::new(PoolCalendarSource::new(client, pool)?),
    })
}

/// The default rule table for a source kind.
pub fn default_rules(config: &SourceConfig) -> Result<RuleSet, RuleSetError> {
    match config {
        SourceConfig::Ebay(_) => ebay::default_rules(),
        SourceConfig::PoolCalendar(_) => pool::default_rules(),
    }
}
