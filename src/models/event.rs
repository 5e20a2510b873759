//! Events derived by a reconciliation pass.

use std::collections::BTreeMap;

use serde::Serialize;

use super::entity::{Attributes, Entity, EntityKey};

/// What happened to an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The entity was observed for the first time.
    New,
    /// The entity satisfied a threshold predicate for the first time.
    ThresholdCrossed,
    /// A tracked scalar value changed since the last pass.
    ValueChanged {
        /// Values as of the previous pass.
        old: Attributes,
        /// Values as of this pass.
        new: Attributes,
    },
    /// The entity is no longer live.
    Finished {
        /// Last-known scalar values, keyed by the rule that tracked them.
        last_known: BTreeMap<String, Attributes>,
        /// Threshold rules the entity had crossed before it finished.
        crossed: Vec<String>,
    },
}

/// One rule firing for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Id of the rule that fired.
    pub rule_id: String,
    /// The entity the rule fired for.
    pub key: EntityKey,
    /// What happened.
    #[serde(flatten)]
    pub kind: EventKind,
    /// Current attributes of the entity, or its merged last-known values once
    /// finished.
    pub attributes: Attributes,
}

impl Event {
    /// Returns true for `Finished` events.
    pub fn is_finished(&self) -> bool {
        matches!(self.kind, EventKind::Finished { .. })
    }

    /// Overlays freshly fetched attributes of the same entity. For value
    /// changes the compared values are refreshed too; attributes the fetch
    /// did not return keep their previous values.
    pub fn refreshed(mut self, current: &Entity) -> Self {
        if let EventKind::ValueChanged { new, .. } = &mut self.kind {
            for (name, value) in new.iter_mut() {
                if let Some(fresh) = current.attributes.get(name) {
                    *value = fresh.clone();
                }
            }
        }
        self.attributes.extend(current.attributes.clone());
        self
    }
}
