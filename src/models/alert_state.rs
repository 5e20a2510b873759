//! Persisted per-rule alert state.
//!
//! Each rule owns one independently stored document: either the set of
//! entity keys it has already fired for, or the last-known scalar values it
//! compares against on the next pass.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::entity::{Attributes, EntityKey};

/// Keys a one-shot rule has already notified for.
pub type KeySet = BTreeSet<EntityKey>;

/// Last-known scalar values of each tracked entity.
pub type ScalarMap = BTreeMap<EntityKey, Attributes>;

/// The state document of a single rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleState {
    /// One-shot rule: keys already notified.
    Keys(KeySet),
    /// Repeatable rule: last-known values per key.
    Scalars(ScalarMap),
}

impl RuleState {
    /// Returns true if the key is tracked by this rule.
    pub fn contains(&self, key: &EntityKey) -> bool {
        match self {
            RuleState::Keys(keys) => keys.contains(key),
            RuleState::Scalars(map) => map.contains_key(key),
        }
    }

    /// Removes the key, returning whether it was present.
    pub fn remove(&mut self, key: &EntityKey) -> bool {
        match self {
            RuleState::Keys(keys) => keys.remove(key),
            RuleState::Scalars(map) => map.remove(key).is_some(),
        }
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        match self {
            RuleState::Keys(keys) => keys.len(),
            RuleState::Scalars(map) => map.len(),
        }
    }

    /// Returns true when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Alert state of one poller: one document per rule, keyed by rule id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    rules: BTreeMap<String, RuleState>,
}

impl AlertState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the document of one rule, builder style.
    pub fn with_rule(mut self, rule_id: &str, state: RuleState) -> Self {
        self.insert(rule_id, state);
        self
    }

    /// Replaces the document of one rule.
    pub fn insert(&mut self, rule_id: &str, state: RuleState) {
        self.rules.insert(rule_id.to_string(), state);
    }

    /// Returns the document of one rule.
    pub fn get(&self, rule_id: &str) -> Option<&RuleState> {
        self.rules.get(rule_id)
    }

    /// Returns the key set of a one-shot rule, if it has one.
    pub fn keys(&self, rule_id: &str) -> Option<&KeySet> {
        match self.rules.get(rule_id) {
            Some(RuleState::Keys(keys)) => Some(keys),
            _ => None,
        }
    }

    /// Returns the scalar map of a repeatable rule, if it has one.
    pub fn scalars(&self, rule_id: &str) -> Option<&ScalarMap> {
        match self.rules.get(rule_id) {
            Some(RuleState::Scalars(map)) => Some(map),
            _ => None,
        }
    }

    /// Returns the key set of a one-shot rule, creating it when missing.
    ///
    /// A document of the wrong shape is discarded and replaced.
    pub fn keys_mut(&mut self, rule_id: &str) -> &mut KeySet {
        let entry = self
            .rules
            .entry(rule_id.to_string())
            .or_insert_with(|| RuleState::Keys(KeySet::new()));
        if !matches!(entry, RuleState::Keys(_)) {
            tracing::warn!(rule_id, "Rule state had the wrong shape, resetting to a key set.");
            *entry = RuleState::Keys(KeySet::new());
        }
        match entry {
            RuleState::Keys(keys) => keys,
            RuleState::Scalars(_) => unreachable!("entry was reset to a key set above"),
        }
    }

    /// Returns the scalar map of a repeatable rule, creating it when missing.
    ///
    /// A document of the wrong shape is discarded and replaced.
    pub fn scalars_mut(&mut self, rule_id: &str) -> &mut ScalarMap {
        let entry = self
            .rules
            .entry(rule_id.to_string())
            .or_insert_with(|| RuleState::Scalars(ScalarMap::new()));
        if !matches!(entry, RuleState::Scalars(_)) {
            tracing::warn!(rule_id, "Rule state had the wrong shape, resetting to a scalar map.");
            *entry = RuleState::Scalars(ScalarMap::new());
        }
        match entry {
            RuleState::Scalars(map) => map,
            RuleState::Keys(_) => unreachable!("entry was reset to a scalar map above"),
        }
    }

    /// Removes the key from every rule's document.
    pub fn purge(&mut self, key: &EntityKey) {
        for state in self.rules.values_mut() {
            state.remove(key);
        }
    }

    /// Returns true if any rule still tracks the key.
    pub fn tracks(&self, key: &EntityKey) -> bool {
        self.rules.values().any(|state| state.contains(key))
    }

    /// Iterates over `(rule_id, document)` pairs in rule id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleState)> {
        self.rules.iter().map(|(id, state)| (id.as_str(), state))
    }
}
