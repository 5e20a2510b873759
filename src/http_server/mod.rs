//! HTTP server module: the on-demand trigger surface and read-only
//! inspection endpoints.

mod auth;
mod documents;
mod error;
mod pollers;
mod status;

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use axum::{Json, Router, middleware, response::IntoResponse, routing::get};
pub use error::ApiError;
use serde_json::json;
pub use status::{PollerStatus, StatusResponse};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{config::AppConfig, persistence::StateStore, runner::Poller};

/// Pollers by name.
pub type PollerRegistry<S> = BTreeMap<String, Arc<Poller<S>>>;

/// Shared state of all handlers.
pub struct ApiState<S> {
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// The state store, for the document endpoint.
    pub repo: Arc<S>,
    /// Every configured poller.
    pub pollers: Arc<PollerRegistry<S>>,
    /// When the server state was created, for uptime reporting.
    pub started_at: Instant,
}

impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            repo: Arc::clone(&self.repo),
            pollers: Arc::clone(&self.pollers),
            started_at: self.started_at,
        }
    }
}

impl<S> ApiState<S> {
    /// Creates the handler state.
    pub fn new(config: Arc<AppConfig>, repo: Arc<S>, pollers: Arc<PollerRegistry<S>>) -> Self {
        Self { config, repo, pollers, started_at: Instant::now() }
    }

    fn poller(&self, name: &str) -> Result<Arc<Poller<S>>, ApiError> {
        self.pollers
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Poller '{name}' not found")))
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router.
pub fn create_router<S: StateStore + 'static>(state: ApiState<S>) -> Router {
    let triggers: Router<ApiState<S>> = Router::new()
        .route("/pollers/{name}/check", get(pollers::check::<S>).post(pollers::check::<S>))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::auth::<S>));

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status::status::<S>))
        .route("/pollers/{name}/current", get(pollers::current::<S>))
        .route("/pollers/{name}/entities/{key}", get(pollers::entity::<S>))
        .route("/state/{key}", get(documents::get_document::<S>))
        .merge(triggers)
        .with_state(state)
}

/// Serves the API on the configured listen address until `cancellation_token`
/// is cancelled.
pub async fn run_server<S: StateStore + 'static>(
    state: ApiState<S>,
    cancellation_token: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(&state.config.server.listen_address).await?;
    tracing::info!(address = %listener.local_addr()?, "HTTP server listening.");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await?;
    tracing::info!("HTTP server has shut down.");
    Ok(())
}
