//! Email delivery through a SendGrid-compatible mail API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::{Value, json};
use url::Url;

use super::{error::NotificationError, traits::Notifier};
use crate::{
    config::{EmailAddress, EmailConfig},
    models::NotificationMessage,
};

/// Sends emails via `POST {base_url}/v3/mail/send`. Every email carries a
/// plain-text part; messages with an HTML body get an HTML part after it.
#[derive(Debug)]
pub struct EmailNotifier {
    client: Arc<ClientWithMiddleware>,
    endpoint: Url,
    config: EmailConfig,
}

impl EmailNotifier {
    /// Creates a new email notifier.
    ///
    /// # Arguments
    /// * `client` - HTTP client with middleware for retries
    /// * `config` - Sender, recipients and API credentials
    pub fn new(
        client: Arc<ClientWithMiddleware>,
        config: EmailConfig,
    ) -> Result<Self, NotificationError> {
        if config.api_key.trim().is_empty() {
            return Err(NotificationError::ConfigError(
                "Mail API key must not be empty".into(),
            ));
        }
        let endpoint = Url::parse(&config.base_url)?.join("v3/mail/send")?;
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// Builds the request payload for one message.
    fn payload(
        &self,
        to: &EmailAddress,
        cc: Option<&EmailAddress>,
        message: &NotificationMessage,
    ) -> Value {
        let mut personalization = json!({ "to": [to] });
        if let Some(cc) = cc {
            personalization["cc"] = json!([cc]);
        }

        let mut content = vec![json!({ "type": "text/plain", "value": message.body })];
        if let Some(html) = &message.html {
            content.push(json!({ "type": "text/html", "value": html }));
        }

        let mut payload = json!({
            "personalizations": [personalization],
            "from": self.config.from,
            "subject": message.title,
            "content": content,
        });
        if !self.config.categories.is_empty() {
            payload["categories"] = json!(self.config.categories);
        }
        payload
    }

    async fn deliver(&self, payload: &Value) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        let cc = self.config.cc_operator.then_some(&self.config.operator);
        let payload = self.payload(&self.config.to, cc, message);
        self.deliver(&payload).await?;
        tracing::info!(
            subject = %message.title,
            html = message.html.is_some(),
            to = %self.config.to.email,
            "Email sent."
        );
        Ok(())
    }

    async fn send_error(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        let message = NotificationMessage::new(subject, body);
        let payload = self.payload(&self.config.operator, None, &message);
        self.deliver(&payload).await?;
        tracing::info!(subject, to = %self.config.operator.email, "Error report sent.");
        Ok(())
    }
}
