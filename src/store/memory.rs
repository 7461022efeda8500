//! In-memory document store for testing.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{DocumentStore, EntityWriter, WriteOutcome};
use crate::types::{EntityId, EntityType};

/// Error type for the in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// A count referenced a collection the store has never seen.
    ///
    /// Counting against an unknown collection is legal (yields zero), so this
    /// is only produced by [`InMemoryDocumentStore::fail_collection`].
    #[error("Injected failure for collection: {0}")]
    InjectedFailure(String),
}

/// In-memory document store for testing.
///
/// Documents are `serde_json::Value` objects held in BTreeMaps for
/// deterministic iteration. Interior mutability keeps the writer trait's
/// `&self` contract; per-collection latency injection makes concurrency
/// behavior observable in tests.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<BTreeMap<String, BTreeMap<String, Value>>>,
    latency: RwLock<BTreeMap<String, Duration>>,
    failing: RwLock<Vec<String>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a document.
    pub fn insert(&self, entity: EntityType, id: &EntityId, doc: Value) {
        self.collections
            .write()
            .entry(entity.collection().to_string())
            .or_default()
            .insert(id.as_str().to_string(), doc);
    }

    /// Remove a document directly, bypassing any gating.
    pub fn remove(&self, entity: EntityType, id: &EntityId) -> bool {
        self.collections
            .write()
            .get_mut(entity.collection())
            .map(|docs| docs.remove(id.as_str()).is_some())
            .unwrap_or(false)
    }

    /// Fetch a document by id.
    pub fn get(&self, entity: EntityType, id: &EntityId) -> Option<Value> {
        self.collections
            .read()
            .get(entity.collection())
            .and_then(|docs| docs.get(id.as_str()).cloned())
    }

    /// Number of documents in an entity's collection.
    pub fn len(&self, entity: EntityType) -> usize {
        self.collections
            .read()
            .get(entity.collection())
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Whether an entity's collection is empty.
    pub fn is_empty(&self, entity: EntityType) -> bool {
        self.len(entity) == 0
    }

    /// Total documents across all collections.
    pub fn total_documents(&self) -> usize {
        self.collections.read().values().map(|docs| docs.len()).sum()
    }

    /// Delay every count against `entity`'s collection by `latency`.
    pub fn set_latency(&self, entity: EntityType, latency: Duration) {
        self.latency
            .write()
            .insert(entity.collection().to_string(), latency);
    }

    /// Make every count against `entity`'s collection fail.
    pub fn fail_collection(&self, entity: EntityType) {
        self.failing.write().push(entity.collection().to_string());
    }

    async fn apply_latency(&self, collection: &str) {
        let latency = self.latency.read().get(collection).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_failure(&self, collection: &str) -> Result<(), InMemoryError> {
        if self.failing.read().iter().any(|c| c == collection) {
            return Err(InMemoryError::InjectedFailure(collection.to_string()));
        }
        Ok(())
    }

    fn count_matching(
        &self,
        collection: &str,
        matches: impl Fn(&Value) -> bool,
    ) -> u64 {
        self.collections
            .read()
            .get(collection)
            .map(|docs| docs.values().filter(|doc| matches(doc)).count() as u64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    type Error = InMemoryError;

    async fn count_equals(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<u64, Self::Error> {
        self.check_failure(collection)?;
        self.apply_latency(collection).await;
        Ok(self.count_matching(collection, |doc| {
            doc.get(field).and_then(Value::as_str) == Some(value)
        }))
    }

    async fn count_contains(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<u64, Self::Error> {
        self.check_failure(collection)?;
        self.apply_latency(collection).await;
        Ok(self.count_matching(collection, |doc| {
            doc.get(field)
                .and_then(Value::as_array)
                .map(|items| items.iter().any(|v| v.as_str() == Some(value)))
                .unwrap_or(false)
        }))
    }
}

#[async_trait]
impl EntityWriter for InMemoryDocumentStore {
    type Error = InMemoryError;

    async fn delete_entity(
        &self,
        entity: EntityType,
        id: &EntityId,
    ) -> Result<WriteOutcome, Self::Error> {
        if self.remove(entity, id) {
            Ok(WriteOutcome::Applied)
        } else {
            Ok(WriteOutcome::NotFound)
        }
    }

    async fn update_entity(
        &self,
        entity: EntityType,
        id: &EntityId,
        state: Value,
    ) -> Result<WriteOutcome, Self::Error> {
        let mut collections = self.collections.write();
        match collections
            .get_mut(entity.collection())
            .and_then(|docs| docs.get_mut(id.as_str()))
        {
            Some(doc) => {
                *doc = state;
                Ok(WriteOutcome::Applied)
            }
            None => Ok(WriteOutcome::NotFound),
        }
    }
}
