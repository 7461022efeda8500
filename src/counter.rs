//! Reference counting: one edge, one count query.

use std::sync::Arc;

use crate::store::DocumentStore;
use crate::types::{Cardinality, EntityId, ReferenceCount, ReferenceEdge};

/// Error type for counting operations.
///
/// Infrastructure failures only — a nonzero count is not an error. Counts are
/// idempotent reads, so callers may retry at their discretion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CountingError {
    /// Store error.
    #[error("Store error: {0}")]
    Store(String),
    /// A fanned-out counting task failed to join.
    #[error("Counting task failed: {0}")]
    TaskJoin(String),
}

impl CountingError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Store(e.to_string())
    }
}

/// Executes one [`ReferenceEdge`] against the store.
///
/// Intentionally dumb and uniform across all edges: the edge supplies the
/// collection, field and match mode, so adding a dependent relationship is a
/// graph edit, not a new counting method. One read-only query per call, no
/// retries, store errors propagate uninterpreted.
#[derive(Debug)]
pub struct ReferenceCounter<S> {
    store: Arc<S>,
}

impl<S> Clone for ReferenceCounter<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: DocumentStore> ReferenceCounter<S> {
    /// Create a counter over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Count documents referencing `target` along `edge`.
    pub async fn count(
        &self,
        edge: &ReferenceEdge,
        target: &EntityId,
    ) -> Result<ReferenceCount, CountingError> {
        let count = match edge.cardinality {
            Cardinality::Single => {
                self.store
                    .count_equals(edge.collection(), edge.field, target.as_str())
                    .await
            }
            Cardinality::Many => {
                self.store
                    .count_contains(edge.collection(), edge.field, target.as_str())
                    .await
            }
        }
        .map_err(CountingError::from_store)?;

        Ok(ReferenceCount::new(edge.clone(), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use crate::types::EntityType;
    use serde_json::json;

    fn store_with_sources() -> Arc<InMemoryDocumentStore> {
        let store = InMemoryDocumentStore::new();
        store.insert(EntityType::Source, &EntityId::new("S1"), json!({"protocolId": "P1"}));
        store.insert(EntityType::Source, &EntityId::new("S2"), json!({"protocolId": "P1"}));
        store.insert(EntityType::Source, &EntityId::new("S3"), json!({"protocolId": "P2"}));
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_count_single_cardinality() {
        let counter = ReferenceCounter::new(store_with_sources());
        let edge = ReferenceEdge::new(
            EntityType::Source,
            EntityType::Protocol,
            "protocolId",
            Cardinality::Single,
        );

        let count = counter.count(&edge, &EntityId::new("P1")).await.unwrap();
        assert_eq!(count.count, 2);
        assert_eq!(count.edge, edge);
    }

    #[tokio::test]
    async fn test_count_many_cardinality() {
        let store = InMemoryDocumentStore::new();
        store.insert(EntityType::Flow, &EntityId::new("F1"), json!({"stepIds": ["ST1", "ST2"]}));
        let counter = ReferenceCounter::new(Arc::new(store));

        let edge = ReferenceEdge::new(
            EntityType::Flow,
            EntityType::Step,
            "stepIds",
            Cardinality::Many,
        );

        let count = counter.count(&edge, &EntityId::new("ST1")).await.unwrap();
        assert_eq!(count.count, 1);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = InMemoryDocumentStore::new();
        store.fail_collection(EntityType::Source);
        let counter = ReferenceCounter::new(Arc::new(store));

        let edge = ReferenceEdge::new(
            EntityType::Source,
            EntityType::Protocol,
            "protocolId",
            Cardinality::Single,
        );

        let err = counter.count(&edge, &EntityId::new("P1")).await.unwrap_err();
        assert!(matches!(err, CountingError::Store(_)));
    }
}
