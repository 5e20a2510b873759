use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    models::NotificationMessage,
    notification::{NotificationError, Notifier},
};

/// A `Notifier` that keeps every message in memory.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    sent: Mutex<Vec<NotificationMessage>>,
    errors: Mutex<Vec<NotificationMessage>>,
    fail: AtomicBool,
}

impl CollectingNotifier {
    /// Creates a notifier with nothing collected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `send` fail, or succeed again. Failed messages
    /// are not collected.
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages delivered through `send`, in order.
    pub async fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().await.clone()
    }

    /// Titles of the messages delivered through `send`, in order.
    pub async fn sent_titles(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|m| m.title.clone()).collect()
    }

    /// Messages delivered through `send_error`, in order.
    pub async fn errors(&self) -> Vec<NotificationMessage> {
        self.errors.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Rejected {
                status: 503,
                body: "unavailable".into(),
            });
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }

    async fn send_error(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        self.errors.lock().await.push(NotificationMessage::new(subject, body));
        Ok(())
    }
}
