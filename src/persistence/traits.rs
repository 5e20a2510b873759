//! Storage interfaces for the pollwatch application.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use super::error::PersistenceError;

/// A generic key-value store for JSON-serializable documents.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieves a JSON-serializable state object by its key.
    async fn get_json_state<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError>;

    /// Sets or updates a JSON-serializable state object by its key.
    async fn set_json_state<T: Serialize + Send + Sync + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError>;

    /// Lists the keys of all stored documents starting with `prefix`.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, PersistenceError>;

    /// Makes sure every completed write is durable. Called on shutdown.
    async fn flush(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Typed load/save on top of a `KeyValueStore`, where an absent document
/// reads as the type's default value.
#[async_trait]
pub trait StateStore: KeyValueStore {
    /// Loads a document, or `T::default()` if it has never been written.
    async fn load<T>(&self, key: &str) -> Result<T, PersistenceError>
    where
        T: DeserializeOwned + Default + Send + Sync + 'static,
    {
        match self.get_json_state::<T>(key).await? {
            Some(value) => Ok(value),
            None => {
                tracing::debug!(key, "Document does not exist yet, using default.");
                Ok(T::default())
            }
        }
    }

    /// Saves a document, replacing any previous value.
    async fn save<T>(&self, key: &str, value: &T) -> Result<(), PersistenceError>
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.set_json_state(key, value).await
    }
}

impl<S: KeyValueStore> StateStore for S {}
