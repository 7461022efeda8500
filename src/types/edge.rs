//! Reference edge types for the integrity kernel.

use serde::{Deserialize, Serialize};
use super::entity::EntityType;

/// Shape of the foreign-key field on the referencing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// The field holds a single id.
    Single,
    /// The field holds an array of ids; matching is membership.
    Many,
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Many => write!(f, "many"),
        }
    }
}

/// A declared foreign-key relationship between two entity types.
///
/// Documents of `from_type` hold a reference to `to_type` via `field`.
/// The full set of edges forms the [`ReferenceGraph`](crate::graph::ReferenceGraph).
///
/// Field names are `&'static str`: the graph is build-time configuration, so
/// the type serializes outward but is never deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReferenceEdge {
    /// The referencing entity type (whose documents hold the foreign key).
    pub from_type: EntityType,
    /// The referenced entity type.
    pub to_type: EntityType,
    /// Name of the foreign-key field on the referencing document.
    pub field: &'static str,
    /// Single-id or array-of-ids field.
    pub cardinality: Cardinality,
}

impl ReferenceEdge {
    /// Declare a new edge.
    pub fn new(
        from_type: EntityType,
        to_type: EntityType,
        field: &'static str,
        cardinality: Cardinality,
    ) -> Self {
        Self { from_type, to_type, field, cardinality }
    }

    /// Collection holding the referencing documents.
    pub fn collection(&self) -> &'static str {
        self.from_type.collection()
    }

    /// String key under which this edge's policy toggle is configured.
    ///
    /// One foreign-key field per referencing collection makes this unique
    /// across the graph, e.g. `"sources.protocolId"`.
    pub fn policy_key(&self) -> String {
        format!("{}.{}", self.collection(), self.field)
    }
}

impl std::fmt::Display for ReferenceEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} via {} ({})",
            self.from_type, self.to_type, self.field, self.cardinality
        )
    }
}
