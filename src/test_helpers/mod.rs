//! A set of helpers for testing

mod fixtures;
mod listing;
mod memory_store;
mod notifier;
mod poller_config;
mod source;

pub use fixtures::{ebay_ended_item_page, ebay_item_page, ebay_result_item, ebay_results_page};
pub use listing::ListingBuilder;
pub use memory_store::MemoryStateStore;
pub use notifier::CollectingNotifier;
pub use poller_config::{PollerConfigBuilder, fast_runner_config};
pub use source::ScriptedSource;
