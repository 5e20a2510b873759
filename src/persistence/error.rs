//! Errors of the state store.

use thiserror::Error;

/// Errors raised while reading or writing state documents.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The database could not be opened.
    #[error("Cannot open state database: {0}")]
    ConnectionFailed(String),

    /// A statement against the store failed.
    #[error("State store operation failed: {0}")]
    OperationFailed(String),

    /// A document could not be encoded, or the stored JSON does not have the
    /// requested shape.
    #[error("State document could not be (de)serialized: {0}")]
    SerializationError(String),

    /// The schema could not be brought up to date.
    #[error("State schema migration failed: {0}")]
    MigrationError(String),

    /// A caller passed an unusable argument, such as a malformed database URL.
    #[error("Invalid state store input: {0}")]
    InvalidInput(String),
}
