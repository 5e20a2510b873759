//! # Notification Service
//!
//! Turns events into rendered messages and delivers them.
//!
//! ## Core Components
//!
//! - **`Notifier`**: the delivery trait, with a regular channel (`send`) and
//!   an operator channel (`send_error`).
//! - **`EmailNotifier`** and **`StdoutNotifier`**: the transports selected by
//!   [`NotifierConfig`].
//! - **`RecordingNotifier`**: wraps a transport and keeps a bounded delivery
//!   log in the state store.
//! - **`TemplateService`**: renders the per-rule message templates against
//!   an event's context.

use std::sync::Arc;

use crate::{
    config::{HttpRetryConfig, NotifierConfig},
    http_client::HttpClientPool,
    persistence::StateStore,
};

mod email;
pub mod error;
mod recording;
mod stdout;
pub mod template;
mod traits;

pub use email::EmailNotifier;
pub use error::NotificationError;
pub use recording::{DELIVERY_LOG_KEY, RecordingNotifier};
pub use stdout::StdoutNotifier;
pub use template::{TemplateService, TemplateServiceError, event_context};
#[cfg(test)]
pub use traits::MockNotifier;
pub use traits::Notifier;

/// Builds the configured transport, wrapped so that every delivery is
/// recorded in `store`.
pub async fn build_notifier<S: StateStore + 'static>(
    config: &NotifierConfig,
    http_clients: &HttpClientPool,
    retry_policy: &HttpRetryConfig,
    store: Arc<S>,
    delivery_log_limit: usize,
) -> Result<Arc<dyn Notifier>, NotificationError> {
    let transport: Arc<dyn Notifier> = match config {
        NotifierConfig::Email(email) => {
            let client = http_clients.get_or_create(retry_policy).await?;
            tracing::info!(to = %email.to.email, "Using email notifier.");
            Arc::new(EmailNotifier::new(client, email.clone())?)
        }
        NotifierConfig::Stdout => {
            tracing::info!("Using stdout notifier.");
            Arc::new(StdoutNotifier)
        }
    };
    Ok(Arc::new(RecordingNotifier::new(transport, store, delivery_log_limit)))
}
