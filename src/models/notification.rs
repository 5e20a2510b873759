//! Data models for notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message template with a title and body, rendered per event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NotificationMessage {
    /// The title (email subject) template.
    pub title: String,
    /// The plain-text body template.
    pub body: String,
    /// An optional HTML body template, sent alongside the plain-text one by
    /// transports that support it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl NotificationMessage {
    /// Creates a plain-text message from title and body templates.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            html: None,
        }
    }

    /// Adds an HTML body template.
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }
}

/// Who a delivery was addressed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// The regular recipient.
    Recipient,
    /// The operator's error channel.
    Operator,
}

/// One entry of the delivery log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryRecord {
    /// When the delivery was attempted.
    pub sent_at: DateTime<Utc>,
    /// Who it was addressed to.
    pub destination: Destination,
    /// Whether the transport accepted it.
    pub success: bool,
    /// The rendered subject.
    pub subject: String,
}
