//! SQLite backed state store. One table holds every document as JSON text
//! under its key.

use std::str::FromStr;

use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};

pub mod key_value_store;

use crate::persistence::error::PersistenceError;

/// SQL query constants for application state documents.
mod state_sql {
    /// Select one document by key
    pub const SELECT_STATE: &str = "SELECT value FROM application_state WHERE key = ?";

    /// Insert or replace one document
    pub const UPSERT_STATE: &str =
        "INSERT OR REPLACE INTO application_state (key, value) VALUES (?, ?)";

    /// Select all keys matching a LIKE pattern
    pub const SELECT_KEYS_LIKE: &str =
        "SELECT key FROM application_state WHERE key LIKE ? ESCAPE '\\' ORDER BY key";
}

/// WAL checkpoint modes issued by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Checkpoint {
    /// Copy what can be copied without waiting for readers.
    Passive,
    /// Copy everything, then truncate the log file.
    Truncate,
}

impl Checkpoint {
    fn pragma(self) -> &'static str {
        match self {
            Checkpoint::Passive => "PRAGMA wal_checkpoint(PASSIVE)",
            Checkpoint::Truncate => "PRAGMA wal_checkpoint(TRUNCATE)",
        }
    }
}

/// Stores every state document as one row of the `application_state` table.
pub struct SqliteStateRepository {
    pool: SqlitePool,
}

impl SqliteStateRepository {
    /// Opens the database at `database_url`, creating the file when it does
    /// not exist yet.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::InvalidInput(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| PersistenceError::ConnectionFailed(e.to_string()))?;
        tracing::info!(database_url, "State database opened.");
        Ok(Self { pool })
    }

    /// Brings the schema up to date.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "State schema migration failed.");
            PersistenceError::MigrationError(e.to_string())
        })?;
        tracing::info!("State schema is up to date.");
        Ok(())
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Moves every committed write from the WAL into the main database file.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        self.checkpoint(Checkpoint::Truncate).await?;
        tracing::debug!("State database flushed.");
        Ok(())
    }

    /// Closes the connection pool. Pending queries finish first.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("State database closed.");
    }

    async fn checkpoint(&self, mode: Checkpoint) -> Result<(), PersistenceError> {
        self.run("checkpoint", sqlx::query(mode.pragma()).execute(&self.pool)).await?;
        Ok(())
    }

    /// Awaits a query, logging and wrapping its error.
    async fn run<F, T, E>(&self, operation: &str, query: F) -> Result<T, PersistenceError>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        query.await.map_err(|e| {
            tracing::error!(error = %e, operation, "State query failed.");
            PersistenceError::OperationFailed(format!("{operation}: {e}"))
        })
    }
}
