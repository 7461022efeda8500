//! Document store backends.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{EntityId, EntityType};

/// Read-only counting capability over a schema-less document store.
///
/// This is the only query surface the kernel needs: one count per reference
/// edge per validation call, no reads of document bodies, no writes.
/// Implementations must not cache counts.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Count documents in `collection` whose `field` equals `value`.
    async fn count_equals(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<u64, Self::Error>;

    /// Count documents in `collection` whose array-valued `field` contains
    /// `value`.
    async fn count_contains(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<u64, Self::Error>;
}

/// Outcome of a delegated write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The document existed and the write was applied.
    Applied,
    /// No document with that id exists; nothing was written.
    NotFound,
}

impl WriteOutcome {
    /// Whether the write touched a document.
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Mutation capability the integrity gate delegates to.
///
/// Non-existence is the writer's concern: the validator treats unknown ids as
/// zero-reference (valid), and the writer reports [`WriteOutcome::NotFound`]
/// from its own lookup.
#[async_trait]
pub trait EntityWriter: Send + Sync {
    /// Error type for write operations.
    type Error: std::error::Error + Send + Sync;

    /// Delete the document of `entity` with the given id.
    async fn delete_entity(
        &self,
        entity: EntityType,
        id: &EntityId,
    ) -> Result<WriteOutcome, Self::Error>;

    /// Replace the document of `entity` with the given id.
    async fn update_entity(
        &self,
        entity: EntityType,
        id: &EntityId,
        state: Value,
    ) -> Result<WriteOutcome, Self::Error>;
}

pub use memory::InMemoryDocumentStore;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresConfig, PostgresDocumentStore};
