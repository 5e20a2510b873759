use std::{collections::HashMap, time::Duration};

use crate::{
    config::{
        EbaySourceConfig, PollerConfig, PoolCalendarConfig, RunnerConfig, SlotFilter,
        SourceConfig,
    },
    models::NotificationMessage,
};

/// A builder for creating `PollerConfig` instances for testing. Defaults to
/// an eBay source with every rule silenced and the timer disabled.
pub struct PollerConfigBuilder {
    config: PollerConfig,
}

impl PollerConfigBuilder {
    /// Creates a builder for an eBay poller watching `seller`.
    pub fn ebay(seller: &str) -> Self {
        Self {
            config: PollerConfig {
                interval_secs: Duration::from_secs(600),
                timer_enabled: false,
                notify: HashMap::new(),
                messages: HashMap::new(),
                source: SourceConfig::Ebay(EbaySourceConfig {
                    seller: seller.to_string(),
                    max_results: 100,
                    base_url: "https://www.ebay.co.uk/".to_string(),
                }),
            },
        }
    }

    /// Creates a builder for a pool calendar poller posting to `endpoint`.
    pub fn pool_calendar(endpoint: &str) -> Self {
        let mut builder = Self::ebay("unused");
        builder.config.source = SourceConfig::PoolCalendar(PoolCalendarConfig {
            endpoint: endpoint.to_string(),
            origin: "https://pool.example".to_string(),
            booking_page: "https://pool.example/bookings/".to_string(),
            calendar_id: 1,
            year: Some(2030),
            good_slots: SlotFilter::default(),
        });
        builder
    }

    /// Enables notifications for the given rules.
    pub fn notify(mut self, rule_ids: &[&str]) -> Self {
        for id in rule_ids {
            self.config.notify.insert(id.to_string(), true);
        }
        self
    }

    /// Overrides the message of one rule.
    pub fn message(mut self, rule_id: &str, title: &str, body: &str) -> Self {
        self.config.messages.insert(rule_id.to_string(), NotificationMessage::new(title, body));
        self
    }

    /// Enables the timer with the given interval.
    pub fn timer(mut self, interval: Duration) -> Self {
        self.config.timer_enabled = true;
        self.config.interval_secs = interval;
        self
    }

    /// Builds the `PollerConfig`.
    pub fn build(self) -> PollerConfig {
        self.config
    }
}

/// A runner configuration with short delays for tests that pause time.
pub fn fast_runner_config(max_attempts: u32) -> RunnerConfig {
    RunnerConfig {
        max_attempts,
        base_delay_ms: Duration::from_millis(100),
        max_delay_secs: Duration::from_secs(1),
    }
}
