//! The data-driven rule table evaluated by the reconciler.
//!
//! A `RuleSet` always contains exactly one `New` rule (whose key set is the
//! ground truth for "entity still live") and exactly one `Finished` rule.
//! Any number of threshold and scalar-change rules may sit between them.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::models::{Entity, NotificationMessage};

/// A predicate deciding whether an entity satisfies a threshold.
pub type Predicate = fn(&Entity) -> bool;

/// How a rule detects its condition and what state it keeps.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Fires once per entity the first time it is observed. Keeps a key set.
    New,
    /// Fires once per entity the first time the predicate holds. Keeps a key set.
    Threshold(Predicate),
    /// Fires whenever any of the listed attributes change between passes.
    /// Keeps the last-known values per key.
    ScalarChange(Vec<String>),
    /// Fires when a tracked entity is no longer live. Keeps no state of its own.
    Finished,
}

/// One entry of the rule table.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Stable id, also used as the name of the rule's state document and of
    /// its enable flag.
    pub id: String,
    /// Detection strategy.
    pub kind: RuleKind,
    /// Message template rendered for each event of this rule.
    pub message: NotificationMessage,
    /// Re-read the entity from its source before notifying, and render with
    /// the fresh attributes.
    pub confirm: bool,
}

impl Rule {
    /// Creates a rule.
    pub fn new(id: impl Into<String>, kind: RuleKind, message: NotificationMessage) -> Self {
        Self {
            id: id.into(),
            kind,
            message,
            confirm: false,
        }
    }

    /// Marks the rule's events for confirmation against the source.
    pub fn confirmed(mut self) -> Self {
        self.confirm = true;
        self
    }

    /// Creates a `New` rule.
    pub fn new_entity(id: impl Into<String>, message: NotificationMessage) -> Self {
        Self::new(id, RuleKind::New, message)
    }

    /// Creates a `Threshold` rule.
    pub fn threshold(
        id: impl Into<String>,
        predicate: Predicate,
        message: NotificationMessage,
    ) -> Self {
        Self::new(id, RuleKind::Threshold(predicate), message)
    }

    /// Creates a `ScalarChange` rule over the given attributes.
    pub fn scalar_change(
        id: impl Into<String>,
        fields: &[&str],
        message: NotificationMessage,
    ) -> Self {
        let fields = fields.iter().map(|f| f.to_string()).collect();
        Self::new(id, RuleKind::ScalarChange(fields), message)
    }

    /// Creates a `Finished` rule.
    pub fn finished(id: impl Into<String>, message: NotificationMessage) -> Self {
        Self::new(id, RuleKind::Finished, message)
    }

    /// Returns true if the rule persists a state document.
    pub fn is_stateful(&self) -> bool {
        !matches!(self.kind, RuleKind::Finished)
    }
}

/// Errors raised when a rule table is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleSetError {
    /// The table has no rule of a mandatory kind.
    #[error("Rule table has no '{0}' rule")]
    MissingRule(&'static str),

    /// The table has more than one rule of a kind that must be unique.
    #[error("Rule table has more than one '{0}' rule")]
    DuplicateKind(&'static str),

    /// Two rules share an id.
    #[error("Rule id '{0}' is used more than once")]
    DuplicateId(String),

    /// A scalar-change rule does not compare any attribute.
    #[error("Scalar rule '{0}' has no fields to compare")]
    EmptyFields(String),

    /// A message override names a rule that is not in the table.
    #[error("No rule with id '{0}'")]
    UnknownRule(String),
}

/// A validated rule table.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Validates and wraps a rule table.
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleSetError> {
        let mut ids = HashSet::new();
        for rule in &rules {
            if !ids.insert(rule.id.as_str()) {
                return Err(RuleSetError::DuplicateId(rule.id.clone()));
            }
            if let RuleKind::ScalarChange(fields) = &rule.kind {
                if fields.is_empty() {
                    return Err(RuleSetError::EmptyFields(rule.id.clone()));
                }
            }
        }

        let count = |pred: fn(&RuleKind) -> bool| rules.iter().filter(|r| pred(&r.kind)).count();
        match count(|k| matches!(k, RuleKind::New)) {
            0 => return Err(RuleSetError::MissingRule("new")),
            1 => {}
            _ => return Err(RuleSetError::DuplicateKind("new")),
        }
        match count(|k| matches!(k, RuleKind::Finished)) {
            0 => return Err(RuleSetError::MissingRule("finished")),
            1 => {}
            _ => return Err(RuleSetError::DuplicateKind("finished")),
        }

        Ok(Self { rules })
    }

    /// The rule whose key set tracks live entities.
    pub fn new_rule(&self) -> &Rule {
        self.rules
            .iter()
            .find(|r| matches!(r.kind, RuleKind::New))
            .unwrap_or_else(|| unreachable!("validated in RuleSet::new"))
    }

    /// The rule that fires when an entity concludes.
    pub fn finished_rule(&self) -> &Rule {
        self.rules
            .iter()
            .find(|r| matches!(r.kind, RuleKind::Finished))
            .unwrap_or_else(|| unreachable!("validated in RuleSet::new"))
    }

    /// Threshold rules with their predicates, in table order.
    pub fn thresholds(&self) -> impl Iterator<Item = (&Rule, Predicate)> {
        self.rules.iter().filter_map(|r| match r.kind {
            RuleKind::Threshold(predicate) => Some((r, predicate)),
            _ => None,
        })
    }

    /// Scalar-change rules with their compared fields, in table order.
    pub fn scalar_rules(&self) -> impl Iterator<Item = (&Rule, &[String])> {
        self.rules.iter().filter_map(|r| match &r.kind {
            RuleKind::ScalarChange(fields) => Some((r, fields.as_slice())),
            _ => None,
        })
    }

    /// Looks a rule up by id.
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// All rules in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Replaces the message templates of the rules named in `overrides`.
    pub fn with_messages(
        mut self,
        overrides: &HashMap<String, NotificationMessage>,
    ) -> Result<Self, RuleSetError> {
        for (id, message) in overrides {
            let rule = self
                .rules
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| RuleSetError::UnknownRule(id.clone()))?;
            rule.message = message.clone();
        }
        Ok(self)
    }
}
