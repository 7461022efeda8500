//! Reference count aggregation for one validation call.

use serde::Serialize;

use super::edge::ReferenceEdge;
use super::entity::{EntityId, EntityType};

/// The result of executing one reference edge against the store.
///
/// Produced fresh on every validation call — counts are never cached because
/// document counts can change between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceCount {
    /// The edge that was counted.
    pub edge: ReferenceEdge,
    /// Number of referencing documents found.
    pub count: u64,
}

impl ReferenceCount {
    /// Create a new count for an edge.
    pub fn new(edge: ReferenceEdge, count: u64) -> Self {
        Self { edge, count }
    }
}

/// Aggregated per-edge counts for one validated entity.
///
/// Counts are held in reference-graph declaration order so that rendered
/// messages are reproducible. Created at the start of one validation call and
/// discarded when the call (or the error it produced) is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceSummary {
    /// The entity type that was validated.
    pub subject_type: EntityType,
    /// The id that was validated.
    pub subject_id: EntityId,
    /// Per-edge counts, in declaration order.
    pub counts: Vec<ReferenceCount>,
}

impl ReferenceSummary {
    /// Assemble a summary from per-edge counts.
    pub fn new(subject_type: EntityType, subject_id: EntityId, counts: Vec<ReferenceCount>) -> Self {
        Self { subject_type, subject_id, counts }
    }

    /// Total number of referencing documents across all counted edges.
    pub fn total_references(&self) -> u64 {
        self.counts.iter().map(|c| c.count).sum()
    }

    /// Whether any counted edge found at least one referencing document.
    pub fn has_references(&self) -> bool {
        self.total_references() > 0
    }

    /// Count contributed by a given referencing entity type, if that type
    /// was counted at all.
    pub fn count_for(&self, from_type: EntityType) -> Option<u64> {
        self.counts
            .iter()
            .filter(|c| c.edge.from_type == from_type)
            .map(|c| c.count)
            .reduce(|a, b| a + b)
    }

    /// Render the human-readable rejection message.
    ///
    /// Lists every referencing type with a nonzero count, in declaration
    /// order, e.g.:
    ///
    /// `Cannot delete/modify Protocol. Found 2 Source reference(s) and 1 Flow reference(s)`
    pub fn render_message(&self) -> String {
        let clauses: Vec<String> = self
            .counts
            .iter()
            .filter(|c| c.count > 0)
            .map(|c| format!("{} {} reference(s)", c.count, c.edge.from_type))
            .collect();

        format!(
            "Cannot delete/modify {}. Found {}",
            self.subject_type,
            clauses.join(" and ")
        )
    }
}

/// Structured conflict payload for callers to surface on rejection.
///
/// This is the one payload contract the kernel imposes: callers translate it
/// into an HTTP 409 body or a rejected command response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ConflictPayload {
    /// The entity type whose mutation was rejected.
    pub subject_type: String,
    /// The id whose mutation was rejected.
    pub subject_id: String,
    /// Total referencing documents found.
    pub total_references: u64,
    /// Per-type breakdown, nonzero entries only, declaration order.
    pub references: Vec<ConflictReference>,
    /// Rendered rejection message.
    pub message: String,
}

/// One entry in the conflict payload breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ConflictReference {
    /// The referencing entity type.
    pub entity_type: String,
    /// Number of referencing documents of that type.
    pub count: u64,
}

impl ConflictPayload {
    /// Build the payload from a summary.
    pub fn from_summary(summary: &ReferenceSummary) -> Self {
        Self {
            subject_type: summary.subject_type.to_string(),
            subject_id: summary.subject_id.to_string(),
            total_references: summary.total_references(),
            references: summary
                .counts
                .iter()
                .filter(|c| c.count > 0)
                .map(|c| ConflictReference {
                    entity_type: c.edge.from_type.to_string(),
                    count: c.count,
                })
                .collect(),
            message: summary.render_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::edge::Cardinality;

    fn edge(from: EntityType, to: EntityType, field: &'static str) -> ReferenceEdge {
        ReferenceEdge::new(from, to, field, Cardinality::Single)
    }

    fn summary(counts: Vec<(EntityType, u64)>) -> ReferenceSummary {
        let counts = counts
            .into_iter()
            .map(|(from, n)| ReferenceCount::new(edge(from, EntityType::Protocol, "protocolId"), n))
            .collect();
        ReferenceSummary::new(EntityType::Protocol, EntityId::new("P1"), counts)
    }

    #[test]
    fn test_total_and_has_references() {
        let s = summary(vec![(EntityType::Source, 2), (EntityType::Destination, 0)]);
        assert_eq!(s.total_references(), 2);
        assert!(s.has_references());

        let empty = summary(vec![(EntityType::Source, 0)]);
        assert_eq!(empty.total_references(), 0);
        assert!(!empty.has_references());
    }

    #[test]
    fn test_message_lists_only_nonzero_types() {
        let s = summary(vec![(EntityType::Source, 2), (EntityType::Destination, 0)]);
        let msg = s.render_message();
        assert_eq!(msg, "Cannot delete/modify Protocol. Found 2 Source reference(s)");
        assert!(!msg.contains("Destination"));
    }

    #[test]
    fn test_message_joins_clauses_with_and() {
        let s = summary(vec![
            (EntityType::Source, 2),
            (EntityType::Destination, 1),
            (EntityType::Flow, 3),
        ]);
        assert_eq!(
            s.render_message(),
            "Cannot delete/modify Protocol. Found 2 Source reference(s) \
             and 1 Destination reference(s) and 3 Flow reference(s)"
        );
    }

    #[test]
    fn test_count_for_sums_multiple_edges_from_same_type() {
        let counts = vec![
            ReferenceCount::new(edge(EntityType::Flow, EntityType::Source, "sourceId"), 2),
            ReferenceCount::new(edge(EntityType::Flow, EntityType::Source, "fallbackSourceId"), 1),
        ];
        let s = ReferenceSummary::new(EntityType::Source, EntityId::new("S1"), counts);
        assert_eq!(s.count_for(EntityType::Flow), Some(3));
        assert_eq!(s.count_for(EntityType::Step), None);
    }

    #[test]
    fn test_conflict_payload() {
        let s = summary(vec![(EntityType::Source, 2), (EntityType::Destination, 0)]);
        let payload = ConflictPayload::from_summary(&s);
        assert_eq!(payload.subject_type, "Protocol");
        assert_eq!(payload.subject_id, "P1");
        assert_eq!(payload.total_references, 2);
        assert_eq!(payload.references.len(), 1);
        assert_eq!(payload.references[0].entity_type, "Source");
        assert_eq!(payload.references[0].count, 2);
    }
}
