//! The Poller drives reconciliation passes for one configured source.

use std::{borrow::Cow, sync::Arc};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::{
    error::RunError,
    status::{PassReport, RunPhase, RunStatus},
};
use crate::{
    config::{PollerConfig, RunnerConfig},
    engine::{Reconciliation, RuleSet, RuleSetError, reconcile},
    models::{Entity, EntityKey, Event},
    notification::{Notifier, TemplateService},
    persistence::{StateStore, load_alert_state, save_alert_state},
    providers::{self, SnapshotSource, SourceError},
};

/// A named poller: one source, its rule table, and the state it owns.
///
/// Passes against the same poller never overlap. Scheduled passes skip when
/// another pass is in flight; on-demand passes wait for it.
pub struct Poller<S> {
    name: String,
    config: PollerConfig,
    runner: RunnerConfig,
    rules: RuleSet,
    source: Arc<dyn SnapshotSource>,
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    templates: TemplateService,
    pass_lock: Mutex<()>,
    status: RwLock<RunStatus>,
}

impl<S: StateStore + 'static> Poller<S> {
    /// Creates a poller with the default rule table of its source kind and
    /// the configured message overrides applied.
    pub fn new(
        name: impl Into<String>,
        config: PollerConfig,
        runner: RunnerConfig,
        source: Arc<dyn SnapshotSource>,
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, RuleSetError> {
        let rules = providers::default_rules(&config.source)?.with_messages(&config.messages)?;
        Ok(Self {
            name: name.into(),
            config,
            runner,
            rules,
            source,
            store,
            notifier,
            templates: TemplateService::new(),
            pass_lock: Mutex::new(()),
            status: RwLock::new(RunStatus::default()),
        })
    }

    /// Replaces the rule table.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// The poller's configured name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The poller's configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// The rule table in effect.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// A copy of the current run status.
    pub async fn status(&self) -> RunStatus {
        self.status.read().await.clone()
    }

    /// Runs a single pass without retries, waiting for any pass in flight.
    #[tracing::instrument(skip(self), fields(poller = %self.name))]
    pub async fn run_once(&self) -> Result<PassReport, RunError> {
        let _guard = self.pass_lock.lock().await;
        self.attempt().await
    }

    /// Runs a pass on behalf of the timer, retrying transient failures with
    /// exponential backoff. Returns `Ok(None)` when the tick was skipped
    /// because a pass was already in flight.
    ///
    /// When the pass is given up, the final error is reported to the operator
    /// and returned.
    #[tracing::instrument(skip(self), fields(poller = %self.name))]
    pub async fn run_scheduled(&self) -> Result<Option<PassReport>, RunError> {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            tracing::info!("Previous pass still in flight, skipping tick.");
            return Ok(None);
        };

        let max_attempts = self.runner.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.attempt().await {
                Ok(report) => return Ok(Some(report)),
                Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                    let delay = self.runner.backoff(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Pass failed, retrying after delay."
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, attempts = attempt + 1, "Pass failed, giving up.");
                    self.escalate(&e, attempt + 1).await;
                    return Err(e);
                }
            }
        }
    }

    /// Fetches the current snapshot without reconciling it.
    pub async fn current(&self) -> Result<Vec<Entity>, SourceError> {
        self.source.fetch_snapshot().await
    }

    /// Fetches the current details of one entity.
    pub async fn inspect(&self, key: &EntityKey) -> Result<Option<Entity>, SourceError> {
        self.source.fetch_entity(key).await
    }

    async fn attempt(&self) -> Result<PassReport, RunError> {
        {
            let mut status = self.status.write().await;
            status.phase = RunPhase::Fetching;
            status.last_run = Some(Utc::now());
        }

        let result = self.pass().await;

        let mut status = self.status.write().await;
        match &result {
            Ok(report) => {
                status.phase = RunPhase::Idle;
                status.last_success = Some(Utc::now());
                status.last_error = None;
                status.passes += 1;
                tracing::info!(
                    entities = report.entities,
                    events = report.events,
                    sent = report.sent,
                    documents_written = report.documents_written,
                    "Pass completed."
                );
            }
            Err(e) => {
                status.phase = RunPhase::Failed;
                status.last_error = Some(e.to_string());
            }
        }
        result
    }

    /// Fetch, reconcile, notify, persist. Nothing is written unless every
    /// step before persisting succeeded.
    async fn pass(&self) -> Result<PassReport, RunError> {
        let snapshot = self.source.fetch_snapshot().await?;
        let prior = load_alert_state(self.store.as_ref(), &self.name, &self.rules).await?;
        tracing::debug!(entities = snapshot.len(), "Snapshot fetched.");

        self.set_phase(RunPhase::Reconciling).await;
        let Reconciliation { state, events } = reconcile(&self.rules, &snapshot, &prior)?;

        self.set_phase(RunPhase::Notifying).await;
        let sent = self.notify(&events).await;

        self.set_phase(RunPhase::Persisting).await;
        let documents_written =
            save_alert_state(self.store.as_ref(), &self.name, &prior, &state).await?;

        Ok(PassReport { entities: snapshot.len(), events: events.len(), sent, documents_written })
    }

    /// Sends the events whose rule is enabled, in order. Failures are logged
    /// and skipped.
    async fn notify(&self, events: &[Event]) -> usize {
        let mut sent = 0;
        for event in events {
            if !self.config.notify_enabled(&event.rule_id) {
                tracing::debug!(
                    rule = %event.rule_id,
                    key = %event.key,
                    "Rule is silenced, not notifying."
                );
                continue;
            }
            let Some(rule) = self.rules.get(&event.rule_id) else {
                continue;
            };
            let event = if rule.confirm {
                Cow::Owned(self.confirm(event).await)
            } else {
                Cow::Borrowed(event)
            };

            let message = match self.templates.render_event(&rule.message, &event, &self.name) {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!(
                        rule = %event.rule_id,
                        key = %event.key,
                        error = %e,
                        "Failed to render message."
                    );
                    continue;
                }
            };

            match self.notifier.send(&message).await {
                Ok(()) => {
                    sent += 1;
                    self.status.write().await.events_sent += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        rule = %event.rule_id,
                        key = %event.key,
                        error = %e,
                        "Failed to send notification."
                    );
                }
            }
        }
        sent
    }

    /// Re-reads the event's entity from the source and overlays what it
    /// returns. When the source cannot provide the entity the event is used
    /// as reconciled.
    async fn confirm(&self, event: &Event) -> Event {
        match self.source.fetch_entity(&event.key).await {
            Ok(Some(current)) => {
                tracing::debug!(rule = %event.rule_id, key = %event.key, "Event confirmed.");
                event.clone().refreshed(&current)
            }
            Ok(None) => {
                tracing::warn!(
                    rule = %event.rule_id,
                    key = %event.key,
                    "Source has no details for entity, using reconciled values."
                );
                event.clone()
            }
            Err(e) => {
                tracing::warn!(
                    rule = %event.rule_id,
                    key = %event.key,
                    error = %e,
                    "Failed to confirm event, using reconciled values."
                );
                event.clone()
            }
        }
    }

    async fn escalate(&self, error: &RunError, attempts: u32) {
        let subject = format!("pollwatch: {} failed", self.name);
        let body = format!(
            "Poller '{}' gave up after {attempts} attempt(s).\n\n{error}",
            self.name
        );
        if let Err(e) = self.notifier.send_error(&subject, &body).await {
            tracing::error!(error = %e, "Failed to report error to the operator.");
        }
    }

    async fn set_phase(&self, phase: RunPhase) {
        self.status.write().await.phase = phase;
    }
}
