//! Core types for the integrity kernel.

pub mod entity;
pub mod edge;
pub mod summary;
pub mod verdict;
pub mod violation;

pub use entity::{EntityId, EntityType};
pub use edge::{Cardinality, ReferenceEdge};
pub use summary::{ConflictPayload, ConflictReference, ReferenceCount, ReferenceSummary};
pub use verdict::ValidationVerdict;
pub use violation::IntegrityViolation;
