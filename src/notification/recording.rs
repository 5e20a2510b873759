//! A notifier decorator that appends every delivery attempt to a bounded log
//! kept in the state store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{error::NotificationError, traits::Notifier};
use crate::{
    models::{DeliveryRecord, Destination, NotificationMessage},
    persistence::StateStore,
};

/// Key of the delivery log document.
pub const DELIVERY_LOG_KEY: &str = "deliveries";

/// Wraps a notifier and records the outcome of every delivery.
pub struct RecordingNotifier<S> {
    inner: Arc<dyn Notifier>,
    store: Arc<S>,
    limit: usize,
    // Serializes the read-modify-write of the log document.
    write_lock: Mutex<()>,
}

impl<S: StateStore> RecordingNotifier<S> {
    /// Creates a recording notifier keeping at most `limit` entries.
    pub fn new(inner: Arc<dyn Notifier>, store: Arc<S>, limit: usize) -> Self {
        Self { inner, store, limit, write_lock: Mutex::new(()) }
    }

    async fn record(&self, destination: Destination, subject: &str, success: bool) {
        if self.limit == 0 {
            return;
        }
        let _guard = self.write_lock.lock().await;

        let mut log: Vec<DeliveryRecord> = match self.store.load(DELIVERY_LOG_KEY).await {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load delivery log.");
                return;
            }
        };
        log.push(DeliveryRecord {
            sent_at: Utc::now(),
            destination,
            success,
            subject: subject.to_string(),
        });
        if log.len() > self.limit {
            let excess = log.len() - self.limit;
            log.drain(..excess);
        }

        if let Err(e) = self.store.save(DELIVERY_LOG_KEY, &log).await {
            tracing::warn!(error = %e, "Failed to write delivery log.");
        }
    }
}

#[async_trait]
impl<S: StateStore + 'static> Notifier for RecordingNotifier<S> {
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        let result = self.inner.send(message).await;
        self.record(Destination::Recipient, &message.title, result.is_ok()).await;
        result
    }

    async fn send_error(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        let result = self.inner.send_error(subject, body).await;
        self.record(Destination::Operator, subject, result.is_ok()).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{notification::traits::MockNotifier, persistence::SqliteStateRepository};

    async fn store() -> Arc<SqliteStateRepository> {
        let repo = SqliteStateRepository::new("sqlite::memory:").await.unwrap();
        repo.run_migrations().await.unwrap();
        Arc::new(repo)
    }

    #[tokio::test]
    async fn test_records_successes_and_failures() {
        let mut inner = MockNotifier::new();
        inner.expect_send().times(1).returning(|_| Ok(()));
        inner.expect_send_error().times(1).returning(|_, _| {
            Err(NotificationError::Rejected { status: 500, body: String::new() })
        });
        let store = store().await;
        let notifier = RecordingNotifier::new(Arc::new(inner), store.clone(), 10);

        notifier.send(&NotificationMessage::new("hello", "body")).await.unwrap();
        assert!(notifier.send_error("broken", "trace").await.is_err());

        let log: Vec<DeliveryRecord> = store.load(DELIVERY_LOG_KEY).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].subject, "hello");
        assert_eq!(log[0].destination, Destination::Recipient);
        assert!(log[0].success);
        assert_eq!(log[1].destination, Destination::Operator);
        assert!(!log[1].success);
    }

    #[tokio::test]
    async fn test_log_is_capped_to_most_recent_entries() {
        let mut inner = MockNotifier::new();
        inner.expect_send().returning(|_| Ok(()));
        let store = store().await;
        let notifier = RecordingNotifier::new(Arc::new(inner), store.clone(), 3);

        for i in 0..5 {
            let message = NotificationMessage::new(format!("message {i}"), "");
            notifier.send(&message).await.unwrap();
        }

        let log: Vec<DeliveryRecord> = store.load(DELIVERY_LOG_KEY).await.unwrap();
        let subjects: Vec<_> = log.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, vec!["message 2", "message 3", "message 4"]);
    }
}
