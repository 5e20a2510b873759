//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::{collections::HashMap, sync::Arc};

use super::{Supervisor, SupervisorError};
use crate::{
    config::AppConfig,
    http_client::HttpClientPool,
    http_server::PollerRegistry,
    notification::{Notifier, build_notifier},
    persistence::StateStore,
    providers::{SnapshotSource, build_source},
    runner::Poller,
};

/// A builder for creating a `Supervisor` instance.
pub struct SupervisorBuilder<S: StateStore + 'static> {
    config: Option<AppConfig>,
    state: Option<Arc<S>>,
    http_clients: Option<Arc<HttpClientPool>>,
    notifier: Option<Arc<dyn Notifier>>,
    sources: HashMap<String, Arc<dyn SnapshotSource>>,
}

impl<S: StateStore + 'static> Default for SupervisorBuilder<S> {
    fn default() -> Self {
        Self {
            config: None,
            state: None,
            http_clients: None,
            notifier: None,
            sources: HashMap::new(),
        }
    }
}

impl<S: StateStore + 'static> SupervisorBuilder<S> {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the state store for the `Supervisor`.
    pub fn state(mut self, state: Arc<S>) -> Self {
        self.state = Some(state);
        self
    }

    /// Shares an existing HTTP client pool. A new pool is created from the
    /// configuration otherwise.
    pub fn http_clients(mut self, http_clients: Arc<HttpClientPool>) -> Self {
        self.http_clients = Some(http_clients);
        self
    }

    /// Uses the given notifier instead of the configured one.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Uses the given source for the named poller instead of the configured
    /// one.
    pub fn source(mut self, poller: &str, source: Arc<dyn SnapshotSource>) -> Self {
        self.sources.insert(poller.to_string(), source);
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    pub async fn build(mut self) -> Result<Supervisor<S>, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let state = self.state.ok_or(SupervisorError::MissingStateStore)?;
        let http_clients = self
            .http_clients
            .unwrap_or_else(|| Arc::new(HttpClientPool::new(config.http_base_config.clone())));

        let notifier = match self.notifier {
            Some(notifier) => notifier,
            None =>
                build_notifier(
                    &config.notifier,
                    &http_clients,
                    &config.http_retry_config,
                    Arc::clone(&state),
                    config.delivery_log_limit,
                )
                .await?,
        };

        let mut pollers = PollerRegistry::new();
        for (name, poller_config) in &config.pollers {
            if poller_config.timer_enabled && poller_config.interval_secs.is_zero() {
                return Err(SupervisorError::InvalidConfiguration(format!(
                    "Poller '{name}' has a zero timer interval"
                )));
            }

            let source = match self.sources.remove(name) {
                Some(source) => source,
                None => {
                    build_source(&poller_config.source, &http_clients, &config.http_retry_config)
                        .await
                        .map_err(|source| SupervisorError::Source {
                            poller: name.clone(),
                            source,
                        })?
                }
            };

            let poller = Poller::new(
                name.clone(),
                poller_config.clone(),
                config.runner.clone(),
                source,
                Arc::clone(&state),
                Arc::clone(&notifier),
            )
            .map_err(|source| SupervisorError::Rules {
                poller: name.clone(),
                source,
            })?;

            tracing::info!(
                poller = %name,
                timer_enabled = poller_config.timer_enabled,
                rules = poller.rules().iter().count(),
                "Poller configured."
            );
            pollers.insert(name.clone(), Arc::new(poller));
        }

        if let Some(unused) = self.sources.keys().next() {
            return Err(SupervisorError::UnknownPoller(unused.clone()));
        }

        Ok(Supervisor::new(config, state, pollers))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_helpers::{
        CollectingNotifier, MemoryStateStore, PollerConfigBuilder, ScriptedSource,
    };

    fn config_with_pollers() -> AppConfig {
        let mut config = AppConfig::default();
        config.pollers.insert("ebay".into(), PollerConfigBuilder::ebay("seller").build());
        config.pollers.insert(
            "pool".into(),
            PollerConfigBuilder::pool_calendar("http://127.0.0.1:1/").build(),
        );
        config
    }

    #[tokio::test]
    async fn build_succeeds_with_configured_pollers() {
        let supervisor = SupervisorBuilder::new()
            .config(config_with_pollers())
            .state(Arc::new(MemoryStateStore::new()))
            .build()
            .await
            .unwrap();

        let names: Vec<_> = supervisor.poller_names().collect();
        assert_eq!(names, vec!["ebay", "pool"]);
        assert!(supervisor.poller("ebay").unwrap().rules().get("new_listing").is_some());
        assert!(supervisor.poller("pool").unwrap().rules().get("new_slot").is_some());
        assert!(matches!(supervisor.poller("nope"), Err(SupervisorError::UnknownPoller(_))));
    }

    #[tokio::test]
    async fn build_fails_if_config_is_missing() {
        let result = SupervisorBuilder::new()
            .state(Arc::new(MemoryStateStore::new()))
            .build()
            .await;
        assert!(matches!(result, Err(SupervisorError::MissingConfig)));
    }

    #[tokio::test]
    async fn build_fails_if_state_store_is_missing() {
        let result = SupervisorBuilder::<MemoryStateStore>::new()
            .config(AppConfig::default())
            .build()
            .await;
        assert!(matches!(result, Err(SupervisorError::MissingStateStore)));
    }

    #[tokio::test]
    async fn build_fails_on_invalid_source_url() {
        let mut config = AppConfig::default();
        let mut poller = PollerConfigBuilder::ebay("seller").build();
        if let crate::config::SourceConfig::Ebay(ebay) = &mut poller.source {
            ebay.base_url = "not a url".into();
        }
        config.pollers.insert("ebay".into(), poller);

        let result = SupervisorBuilder::new()
            .config(config)
            .state(Arc::new(MemoryStateStore::new()))
            .build()
            .await;
        assert!(matches!(result, Err(SupervisorError::Source { poller, .. }) if poller == "ebay"));
    }

    #[tokio::test]
    async fn build_fails_on_zero_timer_interval() {
        let mut config = AppConfig::default();
        config.pollers.insert(
            "ebay".into(),
            PollerConfigBuilder::ebay("seller").timer(Duration::ZERO).build(),
        );

        let result = SupervisorBuilder::new()
            .config(config)
            .state(Arc::new(MemoryStateStore::new()))
            .build()
            .await;
        assert!(matches!(result, Err(SupervisorError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn build_rejects_source_override_for_unknown_poller() {
        let result = SupervisorBuilder::new()
            .config(AppConfig::default())
            .state(Arc::new(MemoryStateStore::new()))
            .notifier(Arc::new(CollectingNotifier::new()))
            .source("ghost", Arc::new(ScriptedSource::new()))
            .build()
            .await;
        assert!(matches!(result, Err(SupervisorError::UnknownPoller(name)) if name == "ghost"));
    }
}
