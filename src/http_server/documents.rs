//! Read-only access to stored state documents.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use super::{ApiError, ApiState};
use crate::persistence::StateStore;

/// Returns a stored document as raw JSON.
pub async fn get_document<S: StateStore + 'static>(
    State(state): State<ApiState<S>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state
        .repo
        .get_json_state::<serde_json::Value>(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No document stored under '{key}'")))?;
    Ok((StatusCode::OK, Json(document)))
}
