//! This module provides a retryable HTTP client and a pool for sharing
//! clients between the sources and the notifier.

mod client;
mod pool;

pub use client::{build_base_client, create_retryable_http_client};
pub use pool::{HttpClientPool, HttpClientPoolError};
