//! The reconciliation engine: a rule table and the pure pass that evaluates
//! it against a snapshot and the prior alert state.

pub mod reconciler;
pub mod rules;

pub use reconciler::{ReconcileError, Reconciliation, reconcile};
pub use rules::{Predicate, Rule, RuleKind, RuleSet, RuleSetError};
