//! Loading and saving a poller's alert state, one document per rule.

use crate::{
    engine::{RuleKind, RuleSet},
    models::{AlertState, KeySet, RuleState, ScalarMap},
    persistence::{error::PersistenceError, traits::StateStore},
};

/// The storage key of one rule's document.
pub fn state_key(poller: &str, rule_id: &str) -> String {
    format!("{poller}:{rule_id}")
}

/// Loads every stateful rule's document for `poller`. Absent documents load
/// as empty.
#[tracing::instrument(skip(store, rules), level = "debug")]
pub async fn load_alert_state<S: StateStore>(
    store: &S,
    poller: &str,
    rules: &RuleSet,
) -> Result<AlertState, PersistenceError> {
    let mut state = AlertState::new();
    for rule in rules.iter() {
        let key = state_key(poller, &rule.id);
        let doc = match rule.kind {
            RuleKind::New | RuleKind::Threshold(_) => {
                RuleState::Keys(store.load::<KeySet>(&key).await?)
            }
            RuleKind::ScalarChange(_) => {
                RuleState::Scalars(store.load::<ScalarMap>(&key).await?)
            }
            RuleKind::Finished => continue,
        };
        state.insert(&rule.id, doc);
    }
    Ok(state)
}

/// Writes the documents of `next` that differ from `prior`. Each document is
/// written independently; the first failure aborts the remaining writes.
///
/// Returns the number of documents written.
#[tracing::instrument(skip(store, prior, next), level = "debug")]
pub async fn save_alert_state<S: StateStore>(
    store: &S,
    poller: &str,
    prior: &AlertState,
    next: &AlertState,
) -> Result<usize, PersistenceError> {
    let mut written = 0;
    for (rule_id, doc) in next.iter() {
        if prior.get(rule_id) == Some(doc) {
            continue;
        }
        let key = state_key(poller, rule_id);
        match doc {
            RuleState::Keys(keys) => store.save(&key, keys).await?,
            RuleState::Scalars(map) => store.save(&key, map).await?,
        }
        written += 1;
    }
    tracing::debug!(poller, written, "Alert state persisted.");
    Ok(written)
}
