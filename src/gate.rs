//! The integrity gate: check, then act.
//!
//! Wraps a plain [`EntityWriter`] so that every delete/update consults the
//! validator first. Gating is explicit composition rather than store
//! inheritance, so it is testable independently of any store implementation.
//!
//! ## Check-then-act race
//!
//! There is no lock between the validator returning a valid verdict and the
//! delegated write: a concurrent request can create or remove a reference in
//! that window. The backing store in scope offers no cross-collection
//! transactions, so this gap is accepted; deployments needing stricter
//! guarantees must wrap the whole guarded operation in a store-level
//! multi-document transaction.

use serde_json::Value;
use std::sync::Arc;

use crate::counter::CountingError;
use crate::store::{DocumentStore, EntityWriter, WriteOutcome};
use crate::types::{EntityId, EntityType, IntegrityViolation};
use crate::validator::IntegrityValidator;

/// Error type for guarded operations.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The mutation was rejected: other entities still reference the subject.
    #[error(transparent)]
    Violation(#[from] IntegrityViolation),
    /// A reference count failed before any verdict was reached.
    #[error(transparent)]
    Counting(#[from] CountingError),
    /// The delegated write itself failed.
    #[error("Write error: {0}")]
    Write(String),
}

impl GateError {
    /// The violation, if this is a rejection.
    pub fn violation(&self) -> Option<&IntegrityViolation> {
        match self {
            Self::Violation(v) => Some(v),
            _ => None,
        }
    }
}

/// Guards a writer's delete/update operations behind reference validation.
///
/// On rejection, zero writes reach the store: validation runs strictly before
/// the delegate is invoked, and a failing verdict short-circuits.
pub struct IntegrityGate<S, W> {
    validator: IntegrityValidator<S>,
    writer: Arc<W>,
}

impl<S, W> IntegrityGate<S, W>
where
    S: DocumentStore + 'static,
    W: EntityWriter,
{
    /// Compose a gate from a validator and the writer it protects.
    pub fn new(validator: IntegrityValidator<S>, writer: Arc<W>) -> Self {
        Self { validator, writer }
    }

    /// The validator behind the gate.
    pub fn validator(&self) -> &IntegrityValidator<S> {
        &self.validator
    }

    /// Delete `id`, but only if nothing references it.
    ///
    /// A rejected delete returns [`GateError::Violation`] and leaves the
    /// store untouched. A nonexistent id validates clean (zero counts) and
    /// surfaces as [`WriteOutcome::NotFound`] from the delegate.
    pub async fn guarded_delete(
        &self,
        entity: EntityType,
        id: &EntityId,
    ) -> Result<WriteOutcome, GateError> {
        let verdict = self.validator.validate_deletion(entity, id).await?;
        if let Some(violation) = verdict.into_violation() {
            tracing::info!(
                subject = %entity,
                id = %id,
                total_references = violation.summary.total_references(),
                "Delete rejected by integrity gate"
            );
            return Err(violation.into());
        }

        self.writer
            .delete_entity(entity, id)
            .await
            .map_err(|e| GateError::Write(e.to_string()))
    }

    /// Replace `id`'s document with `state`, but only if nothing references it.
    ///
    /// Same gating as deletion: an update is validated as "is this entity
    /// still safe to touch".
    pub async fn guarded_update(
        &self,
        entity: EntityType,
        id: &EntityId,
        state: Value,
    ) -> Result<WriteOutcome, GateError> {
        let verdict = self.validator.validate_update(entity, id).await?;
        if let Some(violation) = verdict.into_violation() {
            tracing::info!(
                subject = %entity,
                id = %id,
                total_references = violation.summary.total_references(),
                "Update rejected by integrity gate"
            );
            return Err(violation.into());
        }

        self.writer
            .update_entity(entity, id, state)
            .await
            .map_err(|e| GateError::Write(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use serde_json::json;

    fn gated_store() -> (Arc<InMemoryDocumentStore>, IntegrityGate<InMemoryDocumentStore, InMemoryDocumentStore>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.insert(EntityType::Protocol, &EntityId::new("P1"), json!({"name": "sftp"}));
        store.insert(EntityType::Source, &EntityId::new("S1"), json!({"protocolId": "P1"}));
        store.insert(EntityType::Source, &EntityId::new("S2"), json!({"protocolId": "P1"}));

        let validator = IntegrityValidator::with_standard_graph(Arc::clone(&store));
        let gate = IntegrityGate::new(validator, Arc::clone(&store));
        (store, gate)
    }

    #[tokio::test]
    async fn test_rejected_delete_writes_nothing() {
        let (store, gate) = gated_store();
        let before = store.total_documents();

        let err = gate
            .guarded_delete(EntityType::Protocol, &EntityId::new("P1"))
            .await
            .unwrap_err();

        let violation = err.violation().expect("expected a violation");
        assert_eq!(violation.subject_type(), EntityType::Protocol);
        assert_eq!(violation.summary.total_references(), 2);
        assert_eq!(store.total_documents(), before);
        assert!(store.get(EntityType::Protocol, &EntityId::new("P1")).is_some());
    }

    #[tokio::test]
    async fn test_delete_proceeds_once_references_removed() {
        let (store, gate) = gated_store();
        store.remove(EntityType::Source, &EntityId::new("S1"));
        store.remove(EntityType::Source, &EntityId::new("S2"));

        let outcome = gate
            .guarded_delete(EntityType::Protocol, &EntityId::new("P1"))
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Applied);
        assert!(store.get(EntityType::Protocol, &EntityId::new("P1")).is_none());
    }

    #[tokio::test]
    async fn test_rejected_update_writes_nothing() {
        let (store, gate) = gated_store();

        let err = gate
            .guarded_update(EntityType::Protocol, &EntityId::new("P1"), json!({"name": "https"}))
            .await
            .unwrap_err();

        assert!(err.violation().is_some());
        assert_eq!(
            store.get(EntityType::Protocol, &EntityId::new("P1")),
            Some(json!({"name": "sftp"}))
        );
    }

    #[tokio::test]
    async fn test_nonexistent_id_surfaces_not_found() {
        let (_store, gate) = gated_store();

        let outcome = gate
            .guarded_delete(EntityType::Protocol, &EntityId::new("P404"))
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_counting_failure_is_not_a_violation() {
        let (store, gate) = gated_store();
        store.fail_collection(EntityType::Source);

        let err = gate
            .guarded_delete(EntityType::Protocol, &EntityId::new("P1"))
            .await
            .unwrap_err();

        assert!(err.violation().is_none());
        assert!(matches!(err, GateError::Counting(_)));
    }
}
