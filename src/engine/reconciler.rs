//! The reconciliation pass.
//!
//! Compares a fresh snapshot with the alert state of the previous pass and
//! returns the updated state together with the events to deliver. The pass is
//! pure: it performs no I/O and never mutates its input state.
//!
//! Rules are evaluated in a fixed order, each over the whole snapshot:
//!
//! 1. the `New` rule, which also maintains the set of live entities,
//! 2. threshold rules, in table order,
//! 3. scalar-change rules, in table order,
//! 4. the `Finished` rule, which depends on the results of all the others.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use super::rules::RuleSet;
use crate::models::{AlertState, Attributes, Entity, EntityKey, Event, EventKind};

/// Errors that can occur during reconciliation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The snapshot contained the same key more than once.
    #[error("Snapshot contains duplicate key '{key}'")]
    InvalidSnapshot {
        /// The first duplicated key encountered.
        key: EntityKey,
    },
}

/// The outcome of a reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The prior state with this pass's mutations applied.
    pub state: AlertState,
    /// Events in rule evaluation order.
    pub events: Vec<Event>,
}

/// Reconciles `snapshot` against `prior` using the given rule table.
///
/// Returns `ReconcileError::InvalidSnapshot` without producing any events if
/// two entities share a key.
pub fn reconcile(
    rules: &RuleSet,
    snapshot: &[Entity],
    prior: &AlertState,
) -> Result<Reconciliation, ReconcileError> {
    let mut live = HashSet::with_capacity(snapshot.len());
    for entity in snapshot {
        if !live.insert(&entity.key) {
            return Err(ReconcileError::InvalidSnapshot {
                key: entity.key.clone(),
            });
        }
    }

    let mut state = prior.clone();
    let mut events = Vec::new();

    // Make sure every stateful rule has a document of the right shape, so that
    // the persisted state always covers the whole table.
    state.keys_mut(&rules.new_rule().id);
    for (rule, _) in rules.thresholds() {
        state.keys_mut(&rule.id);
    }
    for (rule, _) in rules.scalar_rules() {
        state.scalars_mut(&rule.id);
    }

    let new_rule = rules.new_rule();
    for entity in snapshot {
        if state.keys_mut(&new_rule.id).insert(entity.key.clone()) {
            tracing::debug!(rule = %new_rule.id, key = %entity.key, "New entity observed.");
            events.push(event(&new_rule.id, entity, EventKind::New));
        }
    }

    for (rule, predicate) in rules.thresholds() {
        for entity in snapshot.iter().filter(|e| predicate(e)) {
            if state.keys_mut(&rule.id).insert(entity.key.clone()) {
                tracing::debug!(rule = %rule.id, key = %entity.key, "Threshold crossed.");
                events.push(event(&rule.id, entity, EventKind::ThresholdCrossed));
            }
        }
    }

    for (rule, fields) in rules.scalar_rules() {
        let tracked = state.scalars_mut(&rule.id);
        for entity in snapshot {
            let current = project(entity, fields);
            match tracked.get(&entity.key) {
                None => {
                    tracked.insert(entity.key.clone(), current);
                }
                Some(old) if *old != current => {
                    tracing::debug!(rule = %rule.id, key = %entity.key, "Tracked value changed.");
                    let kind = EventKind::ValueChanged { old: old.clone(), new: current.clone() };
                    events.push(event(&rule.id, entity, kind));
                    tracked.insert(entity.key.clone(), current);
                }
                Some(_) => {}
            }
        }
    }

    let finished_rule = rules.finished_rule();
    let threshold_ids: Vec<&str> = rules.thresholds().map(|(r, _)| r.id.as_str()).collect();
    let candidates: Vec<EntityKey> = state
        .keys(&new_rule.id)
        .map(|seen| seen.iter().filter(|k| !live.contains(k)).cloned().collect())
        .unwrap_or_default();

    for key in candidates {
        let crossed: Vec<String> = threshold_ids
            .iter()
            .filter(|id| state.keys(id).is_some_and(|keys| keys.contains(&key)))
            .map(|id| id.to_string())
            .collect();

        // An empty snapshot is only trusted for entities that were already
        // near their natural end.
        if snapshot.is_empty() && (threshold_ids.is_empty() || crossed.len() < threshold_ids.len())
        {
            tracing::debug!(
                key = %key,
                "Entity missing from an empty snapshot, keeping it tracked."
            );
            continue;
        }

        let mut last_known = BTreeMap::new();
        let mut attributes = Attributes::new();
        for (rule, _) in rules.scalar_rules() {
            if let Some(values) = state.scalars(&rule.id).and_then(|map| map.get(&key)) {
                attributes.extend(values.clone());
                last_known.insert(rule.id.clone(), values.clone());
            }
        }

        state.purge(&key);
        tracing::debug!(rule = %finished_rule.id, key = %key, "Entity finished.");
        events.push(Event {
            rule_id: finished_rule.id.clone(),
            key,
            kind: EventKind::Finished { last_known, crossed },
            attributes,
        });
    }

    Ok(Reconciliation { state, events })
}

fn event(rule_id: &str, entity: &Entity, kind: EventKind) -> Event {
    Event {
        rule_id: rule_id.to_string(),
        key: entity.key.clone(),
        kind,
        attributes: entity.attributes.clone(),
    }
}

/// The subset of an entity's attributes a scalar rule compares.
fn project(entity: &Entity, fields: &[String]) -> Attributes {
    fields
        .iter()
        .filter_map(|field| entity.get(field).map(|value| (field.clone(), value.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::rules::Rule,
        models::{NotificationMessage, RuleState, Scalar, attr},
    };

    fn rules() -> RuleSet {
        let msg = NotificationMessage::default;
        RuleSet::new(vec![
            Rule::new_entity("new", msg()),
            Rule::threshold("day", |e| e.flag(attr::ENDS_WITHIN_24H), msg()),
            Rule::threshold("hour", |e| e.flag(attr::ENDS_WITHIN_1H), msg()),
            Rule::scalar_change("bid", &[attr::BIDS, attr::PRICE], msg()),
            Rule::scalar_change("title", &[attr::TITLE], msg()),
            Rule::finished("ended", msg()),
        ])
        .unwrap()
    }

    fn listing(key: u64, bids: i64) -> Entity {
        Entity::new(key)
            .with(attr::TITLE, format!("Item {key}"))
            .with(attr::BIDS, bids)
            .with(attr::PRICE, 1.5)
    }

    fn rule_ids(events: &[Event]) -> Vec<(&str, &str)> {
        events.iter().map(|e| (e.rule_id.as_str(), e.key.as_str())).collect()
    }

    #[test]
    fn test_first_pass_emits_new_and_seeds_scalars() {
        let out = reconcile(&rules(), &[listing(1, 0), listing(2, 0)], &AlertState::new()).unwrap();

        assert_eq!(rule_ids(&out.events), vec![("new", "1"), ("new", "2")]);
        assert_eq!(out.state.scalars("bid").map(|m| m.len()), Some(2));
        assert_eq!(out.state.scalars("title").map(|m| m.len()), Some(2));
        assert_eq!(out.state.keys("day").map(|k| k.len()), Some(0));
    }

    #[test]
    fn test_events_follow_rule_order_not_entity_order() {
        let a = listing(1, 0).with(attr::ENDS_WITHIN_24H, true);
        let b = listing(2, 0).with(attr::ENDS_WITHIN_24H, true);

        let out = reconcile(&rules(), &[a, b], &AlertState::new()).unwrap();

        assert_eq!(
            rule_ids(&out.events),
            vec![("new", "1"), ("new", "2"), ("day", "1"), ("day", "2")]
        );
    }

    #[test]
    fn test_value_changed_carries_old_and_new() {
        let first = reconcile(&rules(), &[listing(1, 0)], &AlertState::new()).unwrap();
        let second = reconcile(&rules(), &[listing(1, 2)], &first.state).unwrap();

        assert_eq!(second.events.len(), 1);
        match &second.events[0].kind {
            EventKind::ValueChanged { old, new } => {
                assert_eq!(old.get(attr::BIDS), Some(&Scalar::Int(0)));
                assert_eq!(new.get(attr::BIDS), Some(&Scalar::Int(2)));
            }
            other => panic!("Expected ValueChanged, got {other:?}"),
        }
        assert_eq!(
            second.state.scalars("bid").and_then(|m| m.get(&EntityKey::from(1u64))),
            Some(&Attributes::from([
                (attr::BIDS.to_string(), Scalar::Int(2)),
                (attr::PRICE.to_string(), Scalar::Float(1.5)),
            ]))
        );
    }

    #[test]
    fn test_finished_attaches_last_known_values() {
        let first = reconcile(&rules(), &[listing(1, 4), listing(2, 0)], &AlertState::new())
            .unwrap();
        let second = reconcile(&rules(), &[listing(2, 0)], &first.state).unwrap();

        assert_eq!(rule_ids(&second.events), vec![("ended", "1")]);
        let finished = &second.events[0];
        assert_eq!(finished.attributes.get(attr::BIDS), Some(&Scalar::Int(4)));
        assert_eq!(finished.attributes.get(attr::TITLE), Some(&Scalar::from("Item 1")));
        match &finished.kind {
            EventKind::Finished { last_known, crossed } => {
                assert!(last_known.contains_key("bid"));
                assert!(last_known.contains_key("title"));
                assert!(crossed.is_empty());
            }
            other => panic!("Expected Finished, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_snapshot_finishes_only_fully_crossed_entities() {
        let near_end = listing(1, 1)
            .with(attr::ENDS_WITHIN_24H, true)
            .with(attr::ENDS_WITHIN_1H, true);
        let halfway = listing(2, 1).with(attr::ENDS_WITHIN_24H, true);
        let fresh = listing(3, 1);

        let first =
            reconcile(&rules(), &[near_end, halfway, fresh], &AlertState::new()).unwrap();
        let second = reconcile(&rules(), &[], &first.state).unwrap();

        assert_eq!(rule_ids(&second.events), vec![("ended", "1")]);
        assert!(!second.state.tracks(&EntityKey::from(1u64)));
        assert!(second.state.tracks(&EntityKey::from(2u64)));
        assert!(second.state.tracks(&EntityKey::from(3u64)));
    }

    #[test]
    fn test_empty_snapshot_never_finishes_without_threshold_rules() {
        let msg = NotificationMessage::default;
        let rules = RuleSet::new(vec![
            Rule::new_entity("new", msg()),
            Rule::finished("gone", msg()),
        ])
        .unwrap();

        let first = reconcile(&rules, &[Entity::new("slot")], &AlertState::new()).unwrap();
        let second = reconcile(&rules, &[], &first.state).unwrap();

        assert!(second.events.is_empty());
        assert!(second.state.tracks(&EntityKey::from("slot")));
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let prior = AlertState::new().with_rule("new", RuleState::Keys(Default::default()));
        let err = reconcile(&rules(), &[listing(7, 0), listing(7, 1)], &prior).unwrap_err();

        assert_eq!(err, ReconcileError::InvalidSnapshot { key: EntityKey::from(7u64) });
    }
}
