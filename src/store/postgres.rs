//! PostgreSQL document store for production use.
//!
//! Documents live one table per collection, each table shaped
//! `(id TEXT PRIMARY KEY, doc JSONB NOT NULL)`. Foreign-key fields are
//! looked up inside `doc`, so the layout stays schema-less like the stores
//! this kernel targets.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;

use super::{DocumentStore, EntityWriter, WriteOutcome};
use crate::types::{EntityId, EntityType};

/// Error type for the PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A collection name that is not a safe SQL identifier.
    #[error("Invalid collection name: {0:?}")]
    InvalidCollection(String),
}

/// Configuration for the PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/integrity".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// PostgreSQL document store.
///
/// Counting queries are parameterized throughout; the collection name is the
/// only interpolated fragment and is validated as a bare identifier first.
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Get the connection pool for health checks.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database is reachable.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Reject collection names that are not bare lowercase identifiers.
    ///
    /// Collection names come from [`EntityType::collection`] in practice, but
    /// the trait accepts arbitrary strings and table names cannot be bound as
    /// query parameters.
    fn checked_collection(collection: &str) -> Result<&str, PostgresError> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid {
            Ok(collection)
        } else {
            Err(PostgresError::InvalidCollection(collection.to_string()))
        }
    }

    async fn count_where(
        &self,
        collection: &str,
        predicate: &str,
        field: &str,
        value: &str,
    ) -> Result<u64, PostgresError> {
        let table = Self::checked_collection(collection)?;
        let sql = format!("SELECT COUNT(*) AS n FROM {table} WHERE {predicate}");

        let row = sqlx::query(&sql)
            .bind(field)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;

        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    type Error = PostgresError;

    async fn count_equals(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<u64, Self::Error> {
        self.count_where(collection, "doc->>$1 = $2", field, value)
            .await
    }

    async fn count_contains(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<u64, Self::Error> {
        // jsonb_exists on an array tests string membership
        self.count_where(collection, "jsonb_exists(doc->$1, $2)", field, value)
            .await
    }
}

#[async_trait]
impl EntityWriter for PostgresDocumentStore {
    type Error = PostgresError;

    async fn delete_entity(
        &self,
        entity: EntityType,
        id: &EntityId,
    ) -> Result<WriteOutcome, Self::Error> {
        let table = Self::checked_collection(entity.collection())?;
        let sql = format!("DELETE FROM {table} WHERE id = $1");

        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            Ok(WriteOutcome::Applied)
        } else {
            Ok(WriteOutcome::NotFound)
        }
    }

    async fn update_entity(
        &self,
        entity: EntityType,
        id: &EntityId,
        state: Value,
    ) -> Result<WriteOutcome, Self::Error> {
        let table = Self::checked_collection(entity.collection())?;
        let sql = format!("UPDATE {table} SET doc = $2 WHERE id = $1");

        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .bind(state)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            Ok(WriteOutcome::Applied)
        } else {
            Ok(WriteOutcome::NotFound)
        }
    }
}
