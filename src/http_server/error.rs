//! Defines the custom `ApiError` type for the HTTP server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{persistence::PersistenceError, providers::SourceError, runner::RunError};

/// A custom error type for the API that can be converted into an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// Represents an unauthorized request.
    Unauthorized,

    /// Represents a resource that could not be found.
    NotFound(String),

    /// The upstream provider failed or returned unusable data.
    BadGateway(String),

    /// Represents a generic internal server error.
    InternalServerError(String),
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        ApiError::InternalServerError(err.to_string())
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        ApiError::BadGateway(err.to_string())
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Fetch(e) => e.into(),
            RunError::InvalidSnapshot(e) => ApiError::BadGateway(e.to_string()),
            RunError::Store(e) => e.into(),
        }
    }
}

/// Maps internal errors to user-facing HTTP responses.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::Unauthorized =>
                (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::BadGateway(message) => {
                tracing::warn!(error = %message, "Upstream failure served to client.");
                (StatusCode::BAD_GATEWAY, json!({ "error": message }))
            }
            ApiError::InternalServerError(err) => {
                tracing::error!("Internal server error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal server error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
