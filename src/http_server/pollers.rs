//! Handlers for poller endpoints: on-demand checks and live snapshots.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::{ApiError, ApiState};
use crate::{models::EntityKey, persistence::StateStore};

/// Runs one pass of the named poller and returns its report. Waits for a
/// pass already in flight instead of running concurrently with it.
pub async fn check<S: StateStore + 'static>(
    State(state): State<ApiState<S>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let poller = state.poller(&name)?;
    tracing::info!(poller = %name, "On-demand check requested.");

    let report = poller.run_once().await?;
    Ok((StatusCode::OK, Json(json!({ "status": "ok", "poller": name, "report": report }))))
}

/// Fetches the live snapshot of the named poller without reconciling it.
pub async fn current<S: StateStore + 'static>(
    State(state): State<ApiState<S>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entities = state.poller(&name)?.current().await?;
    Ok((StatusCode::OK, Json(json!({ "poller": name, "entities": entities }))))
}

/// Fetches the live details of one entity of the named poller.
pub async fn entity<S: StateStore + 'static>(
    State(state): State<ApiState<S>>,
    Path((name, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let entity = state
        .poller(&name)?
        .inspect(&EntityKey::new(key))
        .await?
        .ok_or_else(|| ApiError::NotFound("Entity not found".to_string()))?;
    Ok((StatusCode::OK, Json(json!({ "poller": name, "entity": entity }))))
}
