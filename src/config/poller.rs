use std::{collections::HashMap, time::Duration};

use chrono::{NaiveTime, Weekday};
use serde::Deserialize;

use super::{deserialize_duration_from_seconds, deserialize_time_of_day, deserialize_weekdays};
use crate::models::NotificationMessage;

fn default_interval() -> Duration {
    Duration::from_secs(600)
}

/// One independently scheduled poller: a source, its rule table, and the
/// flags that decide which rules send notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Time between two timer ticks.
    #[serde(default = "default_interval", deserialize_with = "deserialize_duration_from_seconds")]
    pub interval_secs: Duration,

    /// Whether the timer path runs at all. On-demand checks work either way.
    #[serde(default)]
    pub timer_enabled: bool,

    /// Rule id to enable flag. A rule that is absent here does not notify,
    /// but its state is still tracked.
    #[serde(default)]
    pub notify: HashMap<String, bool>,

    /// Per-rule overrides of the default message templates.
    #[serde(default)]
    pub messages: HashMap<String, NotificationMessage>,

    /// Where snapshots come from.
    pub source: SourceConfig,
}

impl PollerConfig {
    /// Returns whether events of `rule_id` are sent.
    pub fn notify_enabled(&self, rule_id: &str) -> bool {
        self.notify.get(rule_id).copied().unwrap_or(false)
    }
}

/// The snapshot source of a poller.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A seller's listings on eBay.
    Ebay(EbaySourceConfig),
    /// Bookable slots of a booking calendar.
    PoolCalendar(PoolCalendarConfig),
}

fn default_ebay_base_url() -> String {
    "https://www.ebay.co.uk/".to_string()
}

fn default_max_results() -> u32 {
    100
}

/// Settings of the eBay listings source.
#[derive(Debug, Clone, Deserialize)]
pub struct EbaySourceConfig {
    /// The seller whose listings are watched.
    pub seller: String,

    /// Page size of the search; one page is fetched per pass.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Site root; search and item pages are resolved against it.
    #[serde(default = "default_ebay_base_url")]
    pub base_url: String,
}

fn default_calendar_endpoint() -> String {
    "https://www.poolpartyhailsham.co.uk/wp-admin/admin-ajax.php".to_string()
}

fn default_calendar_origin() -> String {
    "https://www.poolpartyhailsham.co.uk".to_string()
}

fn default_booking_page() -> String {
    "https://www.poolpartyhailsham.co.uk/bookings/".to_string()
}

fn default_calendar_id() -> u32 {
    1
}

/// Settings of the booking calendar source.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolCalendarConfig {
    /// The calendar's AJAX endpoint.
    #[serde(default = "default_calendar_endpoint")]
    pub endpoint: String,

    /// Value of the `Origin` header.
    #[serde(default = "default_calendar_origin")]
    pub origin: String,

    /// Value of the `Referer` header, also linked from notifications.
    #[serde(default = "default_booking_page")]
    pub booking_page: String,

    /// Id of the calendar within the booking plugin.
    #[serde(default = "default_calendar_id")]
    pub calendar_id: u32,

    /// Year to request; the current year when absent.
    #[serde(default)]
    pub year: Option<i32>,

    /// Which available slots are worth a notification.
    #[serde(default)]
    pub good_slots: SlotFilter,
}

fn default_weekdays() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}

fn default_window_start() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_window_end() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 30, 0).unwrap_or(NaiveTime::MIN)
}

/// Weekday and time-of-day window a slot must fall in. Both bounds are
/// inclusive.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SlotFilter {
    /// Days a good slot falls on.
    #[serde(default = "default_weekdays", deserialize_with = "deserialize_weekdays")]
    pub weekdays: Vec<Weekday>,

    /// Earliest start time.
    #[serde(default = "default_window_start", deserialize_with = "deserialize_time_of_day")]
    pub from: NaiveTime,

    /// Latest start time.
    #[serde(default = "default_window_end", deserialize_with = "deserialize_time_of_day")]
    pub until: NaiveTime,
}

impl Default for SlotFilter {
    fn default() -> Self {
        Self {
            weekdays: default_weekdays(),
            from: default_window_start(),
            until: default_window_end(),
        }
    }
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    fn from_yaml(yaml: &str) -> PollerConfig {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_ebay_poller_with_flags() {
        let config = from_yaml(
            r#"
            interval_secs: 300
            timer_enabled: true
            notify:
              new_listing: true
              bid: false
            source:
              kind: ebay
              seller: some_seller
            "#,
        );

        assert_eq!(config.interval_secs, Duration::from_secs(300));
        assert!(config.timer_enabled);
        assert!(config.notify_enabled("new_listing"));
        assert!(!config.notify_enabled("bid"));
        assert!(!config.notify_enabled("ended"));
        match config.source {
            SourceConfig::Ebay(ebay) => {
                assert_eq!(ebay.seller, "some_seller");
                assert_eq!(ebay.max_results, 100);
                assert_eq!(ebay.base_url, "https://www.ebay.co.uk/");
            }
            other => panic!("Expected ebay source, got {other:?}"),
        }
    }

    #[test]
    fn test_pool_poller_defaults() {
        let config = from_yaml(
            r#"
            source:
              kind: pool_calendar
              good_slots:
                weekdays: [sat]
                from: "09:30"
            "#,
        );

        assert!(!config.timer_enabled);
        assert_eq!(config.interval_secs, Duration::from_secs(600));
        match config.source {
            SourceConfig::PoolCalendar(pool) => {
                assert_eq!(pool.calendar_id, 1);
                assert_eq!(pool.year, None);
                assert_eq!(pool.good_slots.weekdays, vec![Weekday::Sat]);
                assert_eq!(pool.good_slots.from, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
                assert_eq!(pool.good_slots.until, NaiveTime::from_hms_opt(14, 30, 0).unwrap());
            }
            other => panic!("Expected pool calendar source, got {other:?}"),
        }
    }

    #[test]
    fn test_message_overrides() {
        let config = from_yaml(
            r#"
            messages:
              new_listing:
                title: "Listed: {{ item.title }}"
                body: "{{ key }}"
              ended:
                title: "Gone: {{ key }}"
                body: "{{ key }}"
                html: "<b>{{ key }}</b>"
            source:
              kind: ebay
              seller: s
            "#,
        );
        assert_eq!(config.messages["new_listing"].title, "Listed: {{ item.title }}");
        assert!(config.messages["new_listing"].html.is_none());
        assert_eq!(config.messages["ended"].html.as_deref(), Some("<b>{{ key }}</b>"));
    }
}
