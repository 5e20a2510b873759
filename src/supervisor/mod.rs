//! The Supervisor manages the lifecycle of the pollwatch service.
//!
//! ## Responsibilities
//!
//! - **Initialization**: The `SupervisorBuilder` constructs every configured
//!   poller with its source, the shared notifier and the state store.
//! - **Scheduling**: one timer task per timer-enabled poller. Ticks that fall
//!   due while a pass is in flight are skipped.
//! - **Trigger surface**: the HTTP server, when enabled.
//! - **Graceful Shutdown**: on Ctrl+C or SIGTERM all tasks are told to stop.
//!   Passes in flight may finish within `shutdown_timeout`, after which the
//!   remaining tasks are aborted and the store is flushed.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::{signal, task::JoinSet, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::RuleSetError,
    http_server::{self, ApiState, PollerRegistry},
    notification::NotificationError,
    persistence::StateStore,
    providers::SourceError,
    runner::Poller,
};

/// Represents the set of errors that can occur while building or running the
/// supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A state store was not provided to the `SupervisorBuilder`.
    #[error("Missing state store for Supervisor")]
    MissingStateStore,

    /// A poller's source could not be created.
    #[error("Failed to create source for poller '{poller}': {source}")]
    Source {
        /// Name of the poller.
        poller: String,
        /// The underlying error.
        source: SourceError,
    },

    /// A poller's rule table is invalid.
    #[error("Invalid rules for poller '{poller}': {source}")]
    Rules {
        /// Name of the poller.
        poller: String,
        /// The underlying error.
        source: RuleSetError,
    },

    /// The notifier could not be created.
    #[error("Failed to create notifier: {0}")]
    Notifier(#[from] NotificationError),

    /// An error occurred due to an invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No poller with the requested name is configured.
    #[error("Unknown poller '{0}'")]
    UnknownPoller(String),
}

/// The primary runtime manager for the application.
pub struct Supervisor<S: StateStore + 'static> {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The persistent store of alert state and the delivery log.
    state: Arc<S>,

    /// Every configured poller, by name.
    pollers: Arc<PollerRegistry<S>>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: JoinSet<()>,
}

impl<S: StateStore + 'static> Supervisor<S> {
    /// Creates a new Supervisor instance. Usually called by the builder.
    pub fn new(config: AppConfig, state: Arc<S>, pollers: PollerRegistry<S>) -> Self {
        Self {
            config: Arc::new(config),
            state,
            pollers: Arc::new(pollers),
            cancellation_token: CancellationToken::new(),
            join_set: JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    pub fn builder() -> SupervisorBuilder<S> {
        SupervisorBuilder::new()
    }

    /// Looks up a poller by name.
    pub fn poller(&self, name: &str) -> Result<Arc<Poller<S>>, SupervisorError> {
        self.pollers
            .get(name)
            .cloned()
            .ok_or_else(|| SupervisorError::UnknownPoller(name.to_string()))
    }

    /// Names of all configured pollers.
    pub fn poller_names(&self) -> impl Iterator<Item = &str> {
        self.pollers.keys().map(String::as_str)
    }

    /// A token that shuts the supervisor down when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Starts all timers and the HTTP server, then runs until a shutdown
    /// signal arrives or a supervised task fails.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        self.spawn_signal_handler();

        if self.config.server.enabled {
            let api_state = ApiState::new(
                Arc::clone(&self.config),
                Arc::clone(&self.state),
                Arc::clone(&self.pollers),
            );
            let token = self.cancellation_token.clone();
            self.join_set.spawn(async move {
                if let Err(e) = http_server::run_server(api_state, token.clone()).await {
                    tracing::error!(error = %e, "HTTP server failed. Initiating shutdown.");
                    token.cancel();
                }
            });
        }

        for poller in self.pollers.values() {
            if !poller.config().timer_enabled {
                tracing::info!(
                    poller = %poller.name(),
                    "Timer disabled, poller runs on demand only."
                );
                continue;
            }
            self.join_set.spawn(run_timer(Arc::clone(poller), self.cancellation_token.clone()));
        }

        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(())) => {}
                        Some(Err(e)) => {
                            tracing::error!(
                                "A supervised task failed: {:?}. Initiating shutdown.",
                                e
                            );
                            self.cancellation_token.cancel();
                        }
                        None => break,
                    }
                }
                _ = self.cancellation_token.cancelled() => break,
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(mut self) {
        let shutdown_timeout = self.config.shutdown_timeout;
        tracing::info!(
            timeout_secs = shutdown_timeout.as_secs(),
            "Waiting for supervised tasks to finish."
        );

        let drain = async {
            while self.join_set.join_next().await.is_some() {}
        };
        if tokio::time::timeout(shutdown_timeout, drain).await.is_err() {
            tracing::warn!(
                "Tasks did not finish within the timeout of {:?}. Aborting them.",
                shutdown_timeout
            );
            self.join_set.shutdown().await;
        }

        if let Err(e) = self.state.flush().await {
            tracing::error!(error = %e, "Failed to flush pending writes.");
        }
        tracing::info!("Supervisor shutdown complete.");
    }

    fn spawn_signal_handler(&mut self) {
        let cancellation_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to register SIGTERM handler.");
                        std::future::pending::<()>().await;
                    }
                }
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = signal::ctrl_c() => {
                    tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown.")
                }
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
                _ = cancellation_token.cancelled() => return,
            }
            cancellation_token.cancel();
        });
    }
}

/// Ticks at the poller's interval and runs a scheduled pass on every tick.
/// A pass that has started is allowed to finish after cancellation.
async fn run_timer<S: StateStore + 'static>(
    poller: Arc<Poller<S>>,
    cancellation_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poller.config().interval_secs);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(
        poller = %poller.name(),
        interval_secs = poller.config().interval_secs.as_secs(),
        "Timer started."
    );

    loop {
        tokio::select! {
            biased;

            _ = cancellation_token.cancelled() => break,

            _ = ticker.tick() => {
                match poller.run_scheduled().await {
                    Ok(Some(_)) | Ok(None) => {}
                    Err(e) => {
                        tracing::error!(
                            poller = %poller.name(),
                            error = %e,
                            "Scheduled pass failed."
                        )
                    }
                }
            }
        }
    }
    tracing::info!(poller = %poller.name(), "Timer has shut down.");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::RunnerConfig,
        test_helpers::{
            CollectingNotifier, ListingBuilder, MemoryStateStore, PollerConfigBuilder,
            ScriptedSource,
        },
    };

    #[tokio::test(start_paused = true)]
    async fn test_timer_runs_on_every_tick_until_cancelled() {
        let source =
            Arc::new(ScriptedSource::new().then_snapshot(vec![ListingBuilder::new(1).build()]));
        let poller = Arc::new(
            Poller::new(
                "ebay",
                PollerConfigBuilder::ebay("seller").timer(Duration::from_secs(60)).build(),
                RunnerConfig::default(),
                source.clone(),
                Arc::new(MemoryStateStore::new()),
                Arc::new(CollectingNotifier::new()),
            )
            .unwrap(),
        );
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_timer(poller, token.clone()));

        // First tick fires immediately, then at 60s and 120s.
        tokio::time::sleep(Duration::from_secs(150)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation_and_flushes() {
        let mut config = AppConfig::default();
        config.server.enabled = false;
        config.shutdown_timeout = Duration::from_secs(1);
        let supervisor =
            Supervisor::new(config, Arc::new(MemoryStateStore::new()), PollerRegistry::new());
        let token = supervisor.cancellation_token();

        let handle = tokio::spawn(supervisor.run());
        token.cancel();

        assert!(handle.await.unwrap().is_ok());
    }
}
