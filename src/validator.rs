//! Validation orchestrator.
//!
//! Given an entity type and an id, runs every applicable reference count and
//! aggregates the results into a [`ValidationVerdict`].
//!
//! ## Algorithm
//!
//! 1. Snapshot the policy; if the kill switch is off, return valid immediately
//! 2. Look up `edges_into(type)` and drop edges whose toggle is off
//! 3. Count each remaining edge — concurrently (fan-out/fan-in over a
//!    `JoinSet`) or sequentially in declaration order, per policy
//! 4. Assemble the summary in declaration order regardless of completion order
//! 5. Render the rejection message if any edge found references
//! 6. Record elapsed wall-clock time and return the verdict
//!
//! Both execution modes produce identical summaries for the same underlying
//! data. No retries happen at this layer; a failed count fails the call, and
//! dropping the `JoinSet` on the error path aborts the remaining in-flight
//! counts.

use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

use crate::counter::{CountingError, ReferenceCounter};
use crate::graph::ReferenceGraph;
use crate::policy::{SharedPolicy, ValidationPolicy};
use crate::store::DocumentStore;
use crate::types::{
    EntityId, EntityType, ReferenceCount, ReferenceEdge, ReferenceSummary, ValidationVerdict,
};

/// Runs reference validation for one entity at a time.
///
/// Holds only read-only shared state (graph, policy handle, store), so
/// concurrent validation calls are fully independent.
pub struct IntegrityValidator<S> {
    counter: ReferenceCounter<S>,
    graph: Arc<ReferenceGraph>,
    policy: SharedPolicy,
}

impl<S> Clone for IntegrityValidator<S> {
    fn clone(&self) -> Self {
        Self {
            counter: self.counter.clone(),
            graph: Arc::clone(&self.graph),
            policy: self.policy.clone(),
        }
    }
}

impl<S: DocumentStore + 'static> IntegrityValidator<S> {
    /// Create a validator over a store and a reference graph.
    pub fn new(store: Arc<S>, graph: Arc<ReferenceGraph>, policy: SharedPolicy) -> Self {
        Self {
            counter: ReferenceCounter::new(store),
            graph,
            policy,
        }
    }

    /// Create a validator with the standard graph and an all-enabled policy.
    pub fn with_standard_graph(store: Arc<S>) -> Self {
        Self::new(
            store,
            Arc::new(ReferenceGraph::standard()),
            SharedPolicy::new(ValidationPolicy::all_enabled()),
        )
    }

    /// The policy handle, for runtime reconfiguration.
    pub fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    /// The reference graph in use.
    pub fn graph(&self) -> &ReferenceGraph {
        &self.graph
    }

    /// Validate that `id` of type `subject` is safe to delete.
    pub async fn validate_deletion(
        &self,
        subject: EntityType,
        id: &EntityId,
    ) -> Result<ValidationVerdict, CountingError> {
        self.validate(subject, id).await
    }

    /// Validate that `id` of type `subject` is safe to update.
    ///
    /// Identical to deletion validation: both ask "is this entity still safe
    /// to touch". An update that re-parents the entity to a new id validates
    /// the old id's deletion.
    pub async fn validate_update(
        &self,
        subject: EntityType,
        id: &EntityId,
    ) -> Result<ValidationVerdict, CountingError> {
        self.validate(subject, id).await
    }

    /// Read-only introspection: the current reference summary, no verdict.
    ///
    /// Counts every edge into `subject` regardless of policy toggles or the
    /// kill switch.
    pub async fn references(
        &self,
        subject: EntityType,
        id: &EntityId,
    ) -> Result<ReferenceSummary, CountingError> {
        let edges: Vec<ReferenceEdge> = self.graph.edges_into(subject).cloned().collect();
        let counts = self.count_sequential(&edges, id).await?;
        Ok(ReferenceSummary::new(subject, id.clone(), counts))
    }

    /// Produce a verdict under the current policy snapshot.
    pub async fn validate(
        &self,
        subject: EntityType,
        id: &EntityId,
    ) -> Result<ValidationVerdict, CountingError> {
        let policy = self.policy.snapshot();
        let started = Instant::now();

        if !policy.enabled {
            tracing::debug!(
                subject = %subject,
                id = %id,
                "Reference validation disabled by policy, passing through"
            );
            let summary = ReferenceSummary::new(subject, id.clone(), Vec::new());
            return Ok(ValidationVerdict::disabled(summary, started.elapsed()));
        }

        let edges: Vec<ReferenceEdge> = self
            .graph
            .edges_into(subject)
            .filter(|e| policy.edge_enabled(e))
            .cloned()
            .collect();

        let counts = if policy.parallel {
            self.count_parallel(&edges, id).await?
        } else {
            self.count_sequential(&edges, id).await?
        };

        let summary = ReferenceSummary::new(subject, id.clone(), counts);
        let verdict = ValidationVerdict::from_summary(summary, started.elapsed());

        if verdict.is_valid {
            tracing::debug!(
                subject = %subject,
                id = %id,
                duration_ms = verdict.duration.as_millis() as u64,
                "Reference validation passed"
            );
        } else {
            tracing::info!(
                subject = %subject,
                id = %id,
                total_references = verdict.summary.total_references(),
                duration_ms = verdict.duration.as_millis() as u64,
                "Reference validation found blocking references"
            );
        }

        Ok(verdict)
    }

    /// Count edges one at a time, in declaration order.
    async fn count_sequential(
        &self,
        edges: &[ReferenceEdge],
        target: &EntityId,
    ) -> Result<Vec<ReferenceCount>, CountingError> {
        let mut counts = Vec::with_capacity(edges.len());
        for edge in edges {
            counts.push(self.counter.count(edge, target).await?);
        }
        Ok(counts)
    }

    /// Fan out one counting task per edge, join on all of them.
    ///
    /// Results are reassembled by edge index so the summary comes out in
    /// declaration order whatever the completion order. Returning early on a
    /// failed count drops the set, which aborts the remaining tasks.
    async fn count_parallel(
        &self,
        edges: &[ReferenceEdge],
        target: &EntityId,
    ) -> Result<Vec<ReferenceCount>, CountingError> {
        let mut tasks: JoinSet<(usize, Result<ReferenceCount, CountingError>)> = JoinSet::new();

        for (index, edge) in edges.iter().cloned().enumerate() {
            let counter = self.counter.clone();
            let target = target.clone();
            tasks.spawn(async move {
                let result = counter.count(&edge, &target).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<ReferenceCount>> = vec![None; edges.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|e| CountingError::TaskJoin(e.to_string()))?;
            slots[index] = Some(result?);
        }

        // Every task reports exactly once, so every slot is filled.
        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use serde_json::json;

    fn seeded_store() -> Arc<InMemoryDocumentStore> {
        let store = InMemoryDocumentStore::new();
        store.insert(EntityType::Source, &EntityId::new("S1"), json!({"protocolId": "P1"}));
        store.insert(EntityType::Source, &EntityId::new("S2"), json!({"protocolId": "P1"}));
        store.insert(EntityType::Destination, &EntityId::new("D1"), json!({"protocolId": "P2"}));
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_unreferenced_id_is_valid() {
        let validator = IntegrityValidator::with_standard_graph(seeded_store());
        let verdict = validator
            .validate_deletion(EntityType::Protocol, &EntityId::new("P9"))
            .await
            .unwrap();

        assert!(verdict.is_valid);
        assert_eq!(verdict.summary.total_references(), 0);
    }

    #[tokio::test]
    async fn test_referenced_id_is_invalid() {
        let validator = IntegrityValidator::with_standard_graph(seeded_store());
        let verdict = validator
            .validate_deletion(EntityType::Protocol, &EntityId::new("P1"))
            .await
            .unwrap();

        assert!(!verdict.is_valid);
        assert_eq!(verdict.summary.total_references(), 2);
        assert_eq!(
            verdict.error_message.as_deref(),
            Some("Cannot delete/modify Protocol. Found 2 Source reference(s)")
        );
    }

    #[tokio::test]
    async fn test_update_validates_like_deletion() {
        let validator = IntegrityValidator::with_standard_graph(seeded_store());
        let id = EntityId::new("P1");

        let deletion = validator.validate_deletion(EntityType::Protocol, &id).await.unwrap();
        let update = validator.validate_update(EntityType::Protocol, &id).await.unwrap();

        assert_eq!(deletion.is_valid, update.is_valid);
        assert_eq!(deletion.summary, update.summary);
    }

    #[tokio::test]
    async fn test_kill_switch_short_circuits() {
        let validator = IntegrityValidator::with_standard_graph(seeded_store());
        validator.policy().update(|p| p.enabled = false);

        let verdict = validator
            .validate_deletion(EntityType::Protocol, &EntityId::new("P1"))
            .await
            .unwrap();

        assert!(verdict.is_valid);
        assert!(verdict.summary.counts.is_empty());
    }

    #[tokio::test]
    async fn test_edge_toggle_removes_contribution() {
        let validator = IntegrityValidator::with_standard_graph(seeded_store());
        validator
            .policy()
            .update(|p| *p = p.clone().disable_edge("sources.protocolId"));

        let verdict = validator
            .validate_deletion(EntityType::Protocol, &EntityId::new("P1"))
            .await
            .unwrap();

        // The Source edge is skipped entirely; only Destination remains.
        assert!(verdict.is_valid);
        assert_eq!(verdict.summary.counts.len(), 1);
        assert_eq!(verdict.summary.counts[0].edge.from_type, EntityType::Destination);
    }

    #[tokio::test]
    async fn test_parallel_and_sequential_agree() {
        let store = seeded_store();
        store.insert(EntityType::Flow, &EntityId::new("F1"), json!({"sourceId": "S1"}));
        store.insert(EntityType::Importer, &EntityId::new("I1"), json!({"sourceId": "S1"}));

        let validator = IntegrityValidator::with_standard_graph(store);
        let id = EntityId::new("S1");

        let parallel = validator.validate_deletion(EntityType::Source, &id).await.unwrap();

        validator.policy().update(|p| p.parallel = false);
        let sequential = validator.validate_deletion(EntityType::Source, &id).await.unwrap();

        assert_eq!(parallel.summary, sequential.summary);
        assert_eq!(parallel.error_message, sequential.error_message);
    }

    #[tokio::test]
    async fn test_references_ignores_policy() {
        let validator = IntegrityValidator::with_standard_graph(seeded_store());
        validator.policy().update(|p| p.enabled = false);

        let summary = validator
            .references(EntityType::Protocol, &EntityId::new("P1"))
            .await
            .unwrap();

        assert_eq!(summary.total_references(), 2);
        assert_eq!(summary.count_for(EntityType::Source), Some(2));
        assert_eq!(summary.count_for(EntityType::Destination), Some(0));
    }

    #[tokio::test]
    async fn test_counting_failure_propagates() {
        let store = seeded_store();
        store.fail_collection(EntityType::Source);
        let validator = IntegrityValidator::with_standard_graph(store);

        let err = validator
            .validate_deletion(EntityType::Protocol, &EntityId::new("P1"))
            .await
            .unwrap_err();

        assert!(matches!(err, CountingError::Store(_)));
    }
}
