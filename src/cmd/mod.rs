//! One-shot command line entry points.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    config::AppConfig,
    persistence::{PersistenceError, sqlite::SqliteStateRepository},
    providers::SourceError,
    runner::RunError,
    supervisor::{Supervisor, SupervisorError},
};

pub mod check;
pub mod current;

pub use check::CheckArgs;
pub use current::CurrentArgs;

/// Errors of the one-shot commands.
#[derive(Error, Debug)]
pub enum CmdError {
    /// The store could not be opened or migrated.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    /// The pollers could not be wired up.
    #[error("Setup error: {0}")]
    Supervisor(#[from] SupervisorError),
    /// The pass failed.
    #[error("Pass failed: {0}")]
    Run(#[from] RunError),
    /// The snapshot could not be fetched.
    #[error("Fetch failed: {0}")]
    Source(#[from] SourceError),
    /// The output could not be serialized.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opens the configured store and wires up every poller, without starting
/// timers or the HTTP server.
pub async fn build(
    config: AppConfig,
) -> Result<(Arc<SqliteStateRepository>, Supervisor<SqliteStateRepository>), CmdError> {
    let repo = Arc::new(SqliteStateRepository::new(&config.database_url).await?);
    repo.run_migrations().await?;
    let supervisor =
        Supervisor::builder().config(config).state(Arc::clone(&repo)).build().await?;
    Ok((repo, supervisor))
}
