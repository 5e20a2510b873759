use std::{
    collections::{HashMap, VecDeque},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    models::{Entity, EntityKey},
    providers::{SnapshotSource, SourceError},
};

/// A `SnapshotSource` that replays a scripted sequence of results. Once the
/// script is exhausted it keeps returning the last successful snapshot.
///
/// Single-entity lookups answer from the details registered with
/// [`ScriptedSource::with_details`] and otherwise search the next snapshot.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<Entity>, SourceError>>>,
    last: Mutex<Vec<Entity>>,
    details: HashMap<EntityKey, Entity>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    /// Creates a source with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a successful fetch.
    pub fn then_snapshot(mut self, snapshot: Vec<Entity>) -> Self {
        self.script.get_mut().push_back(Ok(snapshot));
        self
    }

    /// Appends a failed fetch.
    pub fn then_error(mut self, error: SourceError) -> Self {
        self.script.get_mut().push_back(Err(error));
        self
    }

    /// Registers the details returned when `entity` is looked up on its own.
    pub fn with_details(mut self, entity: Entity) -> Self {
        self.details.insert(entity.key.clone(), entity);
        self
    }

    /// Appends a successful fetch to a source that is already shared.
    pub async fn push_snapshot(&self, snapshot: Vec<Entity>) {
        self.script.lock().await.push_back(Ok(snapshot));
    }

    /// Number of fetches so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch_snapshot(&self) -> Result<Vec<Entity>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().await.pop_front() {
            Some(Ok(snapshot)) => {
                *self.last.lock().await = snapshot.clone();
                Ok(snapshot)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.lock().await.clone()),
        }
    }

    async fn fetch_entity(&self, key: &EntityKey) -> Result<Option<Entity>, SourceError> {
        if let Some(entity) = self.details.get(key) {
            return Ok(Some(entity.clone()));
        }
        Ok(self.fetch_snapshot().await?.into_iter().find(|entity| &entity.key == key))
    }
}
