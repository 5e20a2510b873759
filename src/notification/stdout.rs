use async_trait::async_trait;

use super::{error::NotificationError, traits::Notifier};
use crate::models::NotificationMessage;

/// A notifier that prints messages to standard output.
#[derive(Debug, Default)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        println!("=== Notification: {} ===\n{}\n", message.title, message.body);
        Ok(())
    }

    async fn send_error(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        println!("=== Error Report: {subject} ===\n{body}\n");
        tracing::warn!(subject, "Error report printed to stdout.");
        Ok(())
    }
}
