//! The delivery interface shared by all notifiers.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::NotificationError;
use crate::models::NotificationMessage;

/// Delivers rendered messages. Implementations are fire-and-report: a
/// failure is returned to the caller but never retried here beyond what the
/// HTTP client does.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a rendered message to the regular recipient. Transports without
    /// HTML support ignore `message.html`.
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError>;

    /// Sends an error report to the operator.
    async fn send_error(&self, subject: &str, body: &str) -> Result<(), NotificationError>;
}
