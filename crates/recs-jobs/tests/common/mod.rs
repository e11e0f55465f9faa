//! Shared test collaborators for recs-jobs integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use recs_core::{EntityKind, EntityStore, Error, Result, Vector};

/// In-memory [`EntityStore`] that records persist order.
#[derive(Default)]
pub struct MemoryEntityStore {
    entities: Mutex<HashMap<(EntityKind, i64), JsonValue>>,
    embeddings: Mutex<HashMap<(EntityKind, i64), Vector>>,
    persisted: Mutex<Vec<(EntityKind, i64)>>,
    fetches: AtomicUsize,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with recommendations `1..=count`, named `place-{id}`.
    pub fn with_recommendations(count: i64) -> Self {
        let store = Self::new();
        for id in 1..=count {
            store.insert(
                EntityKind::Recommendation,
                id,
                json!({ "id": id, "place_name": format!("place-{}", id) }),
            );
        }
        store
    }

    pub fn insert(&self, kind: EntityKind, id: i64, entity: JsonValue) {
        self.entities.lock().unwrap().insert((kind, id), entity);
    }

    /// Mark an entity as already embedded.
    pub fn set_embedding(&self, kind: EntityKind, id: i64, vector: Vec<f32>) {
        self.embeddings
            .lock()
            .unwrap()
            .insert((kind, id), Vector::from(vector));
    }

    pub fn embedding(&self, kind: EntityKind, id: i64) -> Option<Vec<f32>> {
        self.embeddings
            .lock()
            .unwrap()
            .get(&(kind, id))
            .map(|v| v.to_vec())
    }

    /// Entity ids in the order their embeddings were persisted.
    pub fn persisted_ids(&self) -> Vec<i64> {
        self.persisted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| *id)
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn fetch_entity(&self, kind: EntityKind, id: i64) -> Result<JsonValue> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.entities
            .lock()
            .unwrap()
            .get(&(kind, id))
            .cloned()
            .ok_or(Error::EntityNotFound { kind, id })
    }

    async fn persist_embedding(&self, kind: EntityKind, id: i64, vector: Vector) -> Result<()> {
        self.embeddings.lock().unwrap().insert((kind, id), vector);
        self.persisted.lock().unwrap().push((kind, id));
        Ok(())
    }

    async fn list_ids(&self, kind: EntityKind, only_missing: bool) -> Result<Vec<i64>> {
        let entities = self.entities.lock().unwrap();
        let embeddings = self.embeddings.lock().unwrap();
        let mut ids: Vec<i64> = entities
            .keys()
            .filter(|(k, id)| *k == kind && !(only_missing && embeddings.contains_key(&(*k, *id))))
            .map(|(_, id)| *id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

/// Shorthand for a shareable store.
pub fn shared(store: MemoryEntityStore) -> Arc<MemoryEntityStore> {
    Arc::new(store)
}
