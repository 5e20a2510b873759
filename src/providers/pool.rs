//! Snapshot source for the bookable slots of a booking calendar.
//!
//! The calendar plugin answers a form POST with a JSON object keyed by date.
//! Each date's value is itself a JSON document, usually embedded as a string,
//! whose `hours` object maps `HH:MM` to the slot's details:
//!
//! ```json
//! { "2025-07-12": "{\"hours\": {\"10:00\": {\"available\": \"3\"}}}" }
//! ```
//!
//! A slot is bookable unless `available` is `"0"`. Only future bookable
//! slots that fall inside the configured weekday/time window become entities.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::{Map, Value};
use url::Url;

use super::traits::{SnapshotSource, SourceError};
use crate::{
    config::{PoolCalendarConfig, SlotFilter},
    engine::{Rule, RuleSet, RuleSetError},
    models::{Entity, NotificationMessage, attr},
};

/// Format of slot keys; sorts chronologically.
const SLOT_KEY_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Human readable slot time, e.g. `Saturday 12 July 2025 10:00`.
const SLOT_DISPLAY_FORMAT: &str = "%A %-d %B %Y %H:%M";

type Clock = fn() -> NaiveDateTime;

fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Fetches the good available slots of a booking calendar.
pub struct PoolCalendarSource {
    client: Arc<ClientWithMiddleware>,
    endpoint: Url,
    config: PoolCalendarConfig,
    clock: Clock,
}

impl PoolCalendarSource {
    /// Creates a source from its configuration.
    pub fn new(
        client: Arc<ClientWithMiddleware>,
        config: &PoolCalendarConfig,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client,
            endpoint: Url::parse(&config.endpoint)?,
            config: config.clone(),
            clock: utc_now,
        })
    }

    /// Replaces the clock deciding which slots are in the past.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint), level = "debug")]
    async fn fetch_schedule(&self) -> Result<String, SourceError> {
        let year = self.config.year.unwrap_or_else(|| (self.clock)().year());
        let form = [
            ("action", "dopbsp_calendar_schedule_get".to_string()),
            ("dopbsp_frontend_ajax_request", "true".to_string()),
            ("id", self.config.calendar_id.to_string()),
            ("year", year.to_string()),
            ("firstYear", "\"false\"".to_string()),
        ];

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Origin", &self.config.origin)
            .header("Referer", &self.config.booking_page)
            .header("Sec-Fetch-Site", "same-origin")
            .header("Sec-Fetch-Mode", "cors")
            .header("Sec-Fetch-Dest", "empty")
            .form(&form)
            .send()
            .await?;

        tracing::debug!(status = %response.status(), "Calendar responded.");
        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                url: self.endpoint.to_string(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(SourceError::Malformed("calendar returned an empty body".into()));
        }
        Ok(body)
    }

    /// Every future bookable slot in the schedule, in chronological order.
    pub fn available_slots(&self, body: &str) -> Result<Vec<NaiveDateTime>, SourceError> {
        let schedule: Map<String, Value> = serde_json::from_str(body).map_err(|e| {
            SourceError::Malformed(format!("calendar schedule is not an object: {e}"))
        })?;
        let now = (self.clock)();

        let mut slots = Vec::new();
        for (date, day) in &schedule {
            let Ok(date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
                tracing::debug!(date, "Skipping schedule entry with an unparseable date.");
                continue;
            };
            let day = embedded_object(day).ok_or_else(|| {
                SourceError::Malformed(format!("schedule for {date} is not an object"))
            })?;
            let Some(hours) = day.get("hours").and_then(embedded_object) else {
                return Err(SourceError::Malformed(format!("schedule for {date} has no hours")));
            };

            for (hour, details) in &hours {
                let Ok(time) = NaiveTime::parse_from_str(hour, "%H:%M") else {
                    tracing::debug!(%date, hour, "Skipping slot with an unparseable time.");
                    continue;
                };
                let slot = date.and_time(time);
                if is_available(details) && slot >= now {
                    slots.push(slot);
                }
            }
        }

        slots.sort();
        Ok(slots)
    }

    fn slot_entity(&self, slot: NaiveDateTime) -> Entity {
        Entity::new(slot.format(SLOT_KEY_FORMAT).to_string())
            .with(attr::START_TIME, slot.format(SLOT_DISPLAY_FORMAT).to_string())
            .with(attr::LINK, self.config.booking_page.as_str())
    }
}

#[async_trait]
impl SnapshotSource for PoolCalendarSource {
    #[tracing::instrument(skip(self), level = "info")]
    async fn fetch_snapshot(&self) -> Result<Vec<Entity>, SourceError> {
        let body = self.fetch_schedule().await?;
        let available = self.available_slots(&body)?;
        let good: Vec<Entity> = available
            .iter()
            .filter(|slot| {
                let good = is_good_slot(&self.config.good_slots, slot);
                tracing::debug!(slot = %slot, good, "Checked slot.");
                good
            })
            .map(|slot| self.slot_entity(*slot))
            .collect();
        tracing::info!(available = available.len(), good = good.len(), "Fetched calendar slots.");
        Ok(good)
    }
}

/// Values may be nested objects or JSON documents embedded as strings.
fn embedded_object(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => serde_json::from_str(text).ok(),
        _ => None,
    }
}

fn is_available(details: &Value) -> bool {
    let details = embedded_object(details);
    match details.as_ref().and_then(|d| d.get("available")) {
        Some(Value::String(count)) => count != "0",
        Some(Value::Number(count)) => count.as_u64() != Some(0),
        _ => true,
    }
}

/// Returns true if the slot is on one of the filter's weekdays and starts
/// within its time window.
pub fn is_good_slot(filter: &SlotFilter, slot: &NaiveDateTime) -> bool {
    filter.weekdays.contains(&slot.weekday())
        && slot.time() >= filter.from
        && slot.time() <= filter.until
}

/// The rule table of a booking calendar poller.
pub fn default_rules() -> Result<RuleSet, RuleSetError> {
    RuleSet::new(vec![
        Rule::new_entity(
            "new_slot",
            NotificationMessage::new(
                "New Good Pool Slot - {{ item.start_time }}",
                "There is a new good swimming slot:\n - {{ item.start_time }}\n\
                 Click to book: {{ item.link }}",
            ),
        ),
        Rule::finished(
            "slot_gone",
            NotificationMessage::new(
                "Pool Slot Gone - {{ key }}",
                "The swimming slot starting {{ key }} is no longer available.",
            ),
        ),
    ])
}
