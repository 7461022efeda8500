//! The reference graph: who points at whom, via which field.
//!
//! The graph is the single place where the domain's foreign-key layout is
//! declared. Adding or removing a dependency is a one-line edit here; the
//! counter and orchestrator are generic over edges and never change.
//!
//! Construction happens once at startup; the graph is read-only afterwards
//! and shared across validation calls.

use crate::types::{Cardinality, EntityType, ReferenceEdge};

/// Directed graph of declared foreign-key relationships.
///
/// Edges are kept in declaration order, and [`edges_into`](Self::edges_into)
/// preserves that order, so rendered rejection messages are reproducible.
#[derive(Debug, Clone)]
pub struct ReferenceGraph {
    edges: Vec<ReferenceEdge>,
}

impl ReferenceGraph {
    /// Start building a graph.
    pub fn builder() -> ReferenceGraphBuilder {
        ReferenceGraphBuilder { edges: Vec::new() }
    }

    /// The production workflow-domain graph.
    ///
    /// | referencing          | referenced  | field           |
    /// |----------------------|-------------|-----------------|
    /// | Source               | Protocol    | `protocolId`    |
    /// | Destination          | Protocol    | `protocolId`    |
    /// | Importer             | Source      | `sourceId`      |
    /// | Flow                 | Source      | `sourceId`      |
    /// | Exporter             | Destination | `destinationId` |
    /// | Flow                 | Destination | `destinationId` |
    /// | Step                 | Processor   | `processorId`   |
    /// | Step                 | Importer    | `importerId`    |
    /// | Step                 | Exporter    | `exporterId`    |
    /// | Flow                 | Step        | `stepIds` (many)|
    /// | OrchestratedFlow     | Flow        | `flowIds` (many)|
    pub fn standard() -> Self {
        use Cardinality::{Many, Single};
        use EntityType::*;

        Self::builder()
            .edge(Source, Protocol, "protocolId", Single)
            .edge(Destination, Protocol, "protocolId", Single)
            .edge(Importer, Source, "sourceId", Single)
            .edge(Flow, Source, "sourceId", Single)
            .edge(Exporter, Destination, "destinationId", Single)
            .edge(Flow, Destination, "destinationId", Single)
            .edge(Step, Processor, "processorId", Single)
            .edge(Step, Importer, "importerId", Single)
            .edge(Step, Exporter, "exporterId", Single)
            .edge(Flow, Step, "stepIds", Many)
            .edge(OrchestratedFlow, Flow, "flowIds", Many)
            .build()
    }

    /// All declared edges, in declaration order.
    pub fn edges(&self) -> &[ReferenceEdge] {
        &self.edges
    }

    /// Edges whose `to_type` equals `target`, in declaration order.
    ///
    /// An entity type nothing points at simply yields an empty iterator.
    pub fn edges_into(&self, target: EntityType) -> impl Iterator<Item = &ReferenceEdge> {
        self.edges.iter().filter(move |e| e.to_type == target)
    }

    /// Edges whose `from_type` equals `source`, in declaration order.
    pub fn edges_from(&self, source: EntityType) -> impl Iterator<Item = &ReferenceEdge> {
        self.edges.iter().filter(move |e| e.from_type == source)
    }
}

/// Builder for [`ReferenceGraph`].
#[derive(Debug, Default)]
pub struct ReferenceGraphBuilder {
    edges: Vec<ReferenceEdge>,
}

impl ReferenceGraphBuilder {
    /// Declare one edge. Declaration order is preserved.
    pub fn edge(
        mut self,
        from: EntityType,
        to: EntityType,
        field: &'static str,
        cardinality: Cardinality,
    ) -> Self {
        self.edges.push(ReferenceEdge::new(from, to, field, cardinality));
        self
    }

    /// Finish building.
    pub fn build(self) -> ReferenceGraph {
        ReferenceGraph { edges: self.edges }
    }
}
