//! # Scheduled Runner
//!
//! Each configured poller executes passes of the state machine
//! `Idle → Fetching → Reconciling → Notifying → Persisting → Idle`, with
//! `Failed` reachable from any step.
//!
//! - Timer passes ([`Poller::run_scheduled`]) retry fetch and store failures
//!   with capped exponential backoff, re-loading state for every attempt, and
//!   report the final failure to the operator.
//! - On-demand passes ([`Poller::run_once`]) run exactly once and return the
//!   result to the caller.

mod error;
mod poller;
mod status;

pub use error::RunError;
pub use poller::Poller;
pub use status::{PassReport, RunPhase, RunStatus};
