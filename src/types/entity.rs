//! Entity types for the integrity kernel.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One of the managed workflow-definition kinds.
///
/// The set is fixed at build time; each kind knows the name of its backing
/// collection in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Transport protocol definition.
    Protocol,
    /// Inbound data source.
    Source,
    /// Outbound data destination.
    Destination,
    /// Payload processor.
    Processor,
    /// Importer binding a source to a flow.
    Importer,
    /// Exporter binding a destination to a flow.
    Exporter,
    /// Single flow step.
    Step,
    /// Flow composed of steps.
    Flow,
    /// Orchestrated flow composed of flows.
    OrchestratedFlow,
}

impl EntityType {
    /// All managed entity types, in declaration order.
    pub const ALL: [EntityType; 9] = [
        Self::Protocol,
        Self::Source,
        Self::Destination,
        Self::Processor,
        Self::Importer,
        Self::Exporter,
        Self::Step,
        Self::Flow,
        Self::OrchestratedFlow,
    ];

    /// Name of the backing collection in the document store.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Protocol => "protocols",
            Self::Source => "sources",
            Self::Destination => "destinations",
            Self::Processor => "processors",
            Self::Importer => "importers",
            Self::Exporter => "exporters",
            Self::Step => "steps",
            Self::Flow => "flows",
            Self::OrchestratedFlow => "orchestrated_flows",
        }
    }

    /// Parse an entity type from its display name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Protocol" => Some(Self::Protocol),
            "Source" => Some(Self::Source),
            "Destination" => Some(Self::Destination),
            "Processor" => Some(Self::Processor),
            "Importer" => Some(Self::Importer),
            "Exporter" => Some(Self::Exporter),
            "Step" => Some(Self::Step),
            "Flow" => Some(Self::Flow),
            "OrchestratedFlow" => Some(Self::OrchestratedFlow),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol => write!(f, "Protocol"),
            Self::Source => write!(f, "Source"),
            Self::Destination => write!(f, "Destination"),
            Self::Processor => write!(f, "Processor"),
            Self::Importer => write!(f, "Importer"),
            Self::Exporter => write!(f, "Exporter"),
            Self::Step => write!(f, "Step"),
            Self::Flow => write!(f, "Flow"),
            Self::OrchestratedFlow => write!(f, "OrchestratedFlow"),
        }
    }
}

/// Unique identifier of one document in the store.
///
/// Document ids are opaque strings (the store in scope is schema-less and
/// imposes no id format). Implements `Ord` for deterministic ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Create an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh UUIDv4-backed id for a new document.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for ty in EntityType::ALL {
            assert!(seen.insert(ty.collection()), "duplicate collection for {ty}");
        }
    }

    #[test]
    fn test_parse_round_trip() {
        for ty in EntityType::ALL {
            assert_eq!(EntityType::parse(&ty.to_string()), Some(ty));
        }
        assert_eq!(EntityType::parse("Widget"), None);
    }

    #[test]
    fn test_entity_id_display() {
        let id = EntityId::new("P1");
        assert_eq!(id.as_str(), "P1");
        assert_eq!(id.to_string(), "P1");
    }

    #[test]
    fn test_random_ids_are_unique() {
        assert_ne!(EntityId::random(), EntityId::random());
    }
}
