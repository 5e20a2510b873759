use serde::{Deserialize, Serialize};

fn default_mail_api_url() -> String {
    "https://api.sendgrid.com/".to_string()
}

/// A mailbox, optionally with a display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// The address itself.
    pub email: String,
    /// Display name shown by mail clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EmailAddress {
    /// Creates an address without a display name.
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into(), name: None }
    }
}

/// Settings of the email transport.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Root of the SendGrid-compatible mail API.
    #[serde(default = "default_mail_api_url")]
    pub base_url: String,

    /// Bearer token for the mail API.
    pub api_key: String,

    /// Sender of every message.
    pub from: EmailAddress,

    /// Receives the regular notifications.
    pub to: EmailAddress,

    /// Receives error reports, and a copy of regular notifications when
    /// `cc_operator` is set.
    pub operator: EmailAddress,

    /// Copy the operator on regular notifications.
    #[serde(default)]
    pub cc_operator: bool,

    /// Categories attached to every message for filtering on the provider side.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Which notifier delivers messages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Send through the mail API.
    Email(EmailConfig),
    /// Write messages to the log only.
    #[default]
    Stdout,
}
