//! Authentication middleware for the HTTP server.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

use super::{ApiState, error::ApiError};
use crate::persistence::StateStore;

/// Middleware requiring `Authorization: Bearer <api_key>` when an API key is
/// configured. Without a key every request passes.
pub async fn auth<S: StateStore + 'static>(
    State(state): State<ApiState<S>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(api_key) = state.config.server.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    if token == api_key { Ok(next.run(request).await) } else { Err(ApiError::Unauthorized) }
}
