//! # integrity-kernel
//!
//! Referential-integrity validation for workflow-definition graphs persisted
//! in schema-less document stores.
//!
//! The kernel answers one question:
//!
//! > Before this entity is deleted or modified, does anything else still
//! > depend on it?
//!
//! ## Core Contract
//!
//! 1. A declared [`ReferenceGraph`] lists every foreign-key relationship
//!    between entity types
//! 2. A validation call counts referencing documents along every applicable
//!    edge, concurrently or sequentially per policy
//! 3. A failing verdict blocks the mutation with a typed
//!    [`IntegrityViolation`] carrying the full per-type breakdown
//!
//! ## Architecture
//!
//! ```text
//! caller → IntegrityGate → IntegrityValidator → ReferenceGraph (which edges)
//!                                 ↓
//!                          ReferenceCounter (fan-out counts per edge)
//!                                 ↓
//!                        DocumentStore (Postgres or Memory)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Edge ordering is declaration order, so rejection messages are reproducible
//! - Parallel and sequential counting produce identical summaries for the
//!   same underlying data
//! - Counts are computed fresh on every call, never cached
//!
//! ## Known Gap: Check-Then-Act
//!
//! Between a valid verdict and the delegated write, a concurrent request can
//! create or remove a reference. The document stores in scope offer no
//! cross-collection transactions, so the gate is best-effort by design; see
//! [`gate`] for details.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod graph;
pub mod policy;
pub mod store;
pub mod counter;
pub mod validator;
pub mod gate;

// Re-exports
pub use types::{EntityId, EntityType, Cardinality, ReferenceEdge};
pub use types::{ConflictPayload, ConflictReference, ReferenceCount, ReferenceSummary};
pub use types::{IntegrityViolation, ValidationVerdict};
pub use graph::{ReferenceGraph, ReferenceGraphBuilder};
pub use policy::{PolicyError, SharedPolicy, ValidationPolicy};
pub use store::{DocumentStore, EntityWriter, InMemoryDocumentStore, WriteOutcome};
#[cfg(feature = "postgres")]
pub use store::{PostgresConfig, PostgresDocumentStore};
pub use counter::{CountingError, ReferenceCounter};
pub use validator::IntegrityValidator;
pub use gate::{GateError, IntegrityGate};
