//! Error types for the notification service.

use thiserror::Error;

use crate::{http_client::HttpClientPoolError, notification::template::TemplateServiceError};

/// Defines the possible errors that can occur while delivering a message.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// An error related to invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The transport answered but refused the message.
    #[error("Message rejected with status {status}: {body}")]
    Rejected {
        /// The status code received.
        status: u16,
        /// The response body, for diagnosis.
        body: String,
    },

    /// An error originating from the HTTP client pool.
    #[error("HTTP client error")]
    HttpClientError(#[from] HttpClientPoolError),

    /// An error from the underlying `reqwest` or `reqwest_middleware`
    /// libraries.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest_middleware::Error),

    /// The configured endpoint is not a valid URL.
    #[error("Invalid endpoint: {0}")]
    UrlError(#[from] url::ParseError),

    /// An error related to the template rendering process.
    #[error("Template rendering error: {0}")]
    TemplateError(#[from] TemplateServiceError),
}
