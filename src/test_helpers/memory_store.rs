use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::persistence::{KeyValueStore, PersistenceError};

/// An in-memory `KeyValueStore` that can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    documents: Mutex<BTreeMap<String, serde_json::Value>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read fail, or succeed again.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail, or succeed again.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns a raw stored document.
    pub async fn document(&self, key: &str) -> Option<serde_json::Value> {
        self.documents.lock().await.get(key).cloned()
    }

    /// Returns the keys of all stored documents.
    pub async fn keys(&self) -> Vec<String> {
        self.documents.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStateStore {
    async fn get_json_state<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistenceError::OperationFailed("read failure injected".into()));
        }
        match self.documents.lock().await.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| PersistenceError::SerializationError(e.to_string())),
            None => Ok(None),
        }
    }

    async fn set_json_state<T: Serialize + Send + Sync + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::OperationFailed("write failure injected".into()));
        }
        let value = serde_json::to_value(value)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;
        self.documents.lock().await.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, PersistenceError> {
        Ok(self.documents.lock().await.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}
