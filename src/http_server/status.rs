//! Represents the `/status` endpoint handler and response structure.

use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;

use super::{ApiError, ApiState};
use crate::{persistence::StateStore, runner::RunStatus};

/// Status of one poller.
#[derive(Debug, Serialize, Clone)]
pub struct PollerStatus {
    /// Whether the timer path is active.
    pub timer_enabled: bool,
    /// Seconds between timer ticks.
    pub interval_secs: u64,
    /// Progress and outcome of the most recent passes.
    #[serde(flatten)]
    pub run: RunStatus,
}

/// Represents the response from the `/status` endpoint.
#[derive(Debug, Serialize, Clone)]
pub struct StatusResponse {
    /// The version of the application.
    pub version: String,
    /// The uptime of the application in seconds.
    pub uptime_secs: u64,
    /// Status of every configured poller.
    pub pollers: BTreeMap<String, PollerStatus>,
}

/// Retrieves application and poller status.
pub async fn status<S: StateStore + 'static>(
    State(state): State<ApiState<S>>,
) -> Result<impl IntoResponse, ApiError> {
    let mut pollers = BTreeMap::new();
    for (name, poller) in state.pollers.iter() {
        pollers.insert(
            name.clone(),
            PollerStatus {
                timer_enabled: poller.config().timer_enabled,
                interval_secs: poller.config().interval_secs.as_secs(),
                run: poller.status().await,
            },
        );
    }

    let response = StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        pollers,
    };
    Ok((StatusCode::OK, Json(response)))
}
