use chrono::{DateTime, Utc};
use serde::Serialize;

/// The step a poller is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// No pass in flight.
    #[default]
    Idle,
    /// Fetching the snapshot and loading alert state.
    Fetching,
    /// Diffing the snapshot against the stored state.
    Reconciling,
    /// Sending notifications for the pass's events.
    Notifying,
    /// Writing changed rule documents.
    Persisting,
    /// The last attempt failed. A retry may be pending.
    Failed,
}

/// Summary of one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Number of entities in the fetched snapshot.
    pub entities: usize,
    /// Number of events the reconciler produced.
    pub events: usize,
    /// Number of notifications delivered.
    pub sent: usize,
    /// Number of rule documents written.
    pub documents_written: usize,
}

/// Observable state of a poller, served by the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatus {
    /// Current step.
    pub phase: RunPhase,
    /// Start of the most recent attempt.
    pub last_run: Option<DateTime<Utc>>,
    /// Completion of the most recent successful pass.
    pub last_success: Option<DateTime<Utc>>,
    /// Error of the most recent attempt, cleared on success.
    pub last_error: Option<String>,
    /// Total notifications delivered since start.
    pub events_sent: u64,
    /// Total successful passes since start.
    pub passes: u64,
}
