//! Configuration module for pollwatch.

mod app_config;
mod helpers;
mod http_base;
mod http_retry;
mod notifier;
mod poller;
mod runner;
mod server;

pub use app_config::AppConfig;
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, deserialize_time_of_day,
    deserialize_weekdays, serialize_duration_to_ms, serialize_duration_to_seconds,
};
pub use http_base::BaseHttpClientConfig;
pub use http_retry::{HttpRetryConfig, JitterSetting};
pub use notifier::{EmailAddress, EmailConfig, NotifierConfig};
pub use poller::{EbaySourceConfig, PollerConfig, PoolCalendarConfig, SlotFilter, SourceConfig};
pub use runner::RunnerConfig;
pub use server::ServerConfig;
