use thiserror::Error;

use crate::{engine::ReconcileError, persistence::PersistenceError, providers::SourceError};

/// Errors that end a pass.
#[derive(Debug, Error)]
pub enum RunError {
    /// The snapshot could not be fetched.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] SourceError),

    /// Alert state could not be loaded or saved.
    #[error("State store failed: {0}")]
    Store(#[from] PersistenceError),

    /// The snapshot was rejected by the reconciler.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] ReconcileError),
}

impl RunError {
    /// Returns true if another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKey;

    #[test]
    fn test_transient_classification() {
        assert!(RunError::Fetch(SourceError::Malformed("x".into())).is_transient());
        assert!(RunError::Store(PersistenceError::OperationFailed("x".into())).is_transient());
        let invalid = ReconcileError::InvalidSnapshot {
            key: EntityKey::from("1"),
        };
        assert!(!RunError::InvalidSnapshot(invalid).is_transient());
    }
}
