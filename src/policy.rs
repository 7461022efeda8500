//! Validation policy: kill switch, execution mode, per-edge toggles.
//!
//! ## Configuration
//!
//! All flags can be configured via environment variables:
//! - `INTEGRITY_VALIDATION_ENABLED`: global kill switch (default: true)
//! - `INTEGRITY_PARALLEL_VALIDATION`: fan out counts concurrently (default: true)
//! - `INTEGRITY_VALIDATE_<COLLECTION>_<FIELD>`: per-edge toggle (default: true),
//!   e.g. `INTEGRITY_VALIDATE_SOURCES_PROTOCOLID=false`
//!
//! The orchestrator snapshots the policy at the start of every validation
//! call, so updates through [`SharedPolicy`] take effect without restart.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::graph::ReferenceGraph;
use crate::types::ReferenceEdge;

/// An invalid policy flag value.
///
/// Strict loading treats this as fatal at startup; the lossy path logs a
/// warning and falls back to the default, never silently.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid boolean for {key}: {value:?} (expected true/false/1/0/yes/no/on/off)")]
pub struct PolicyError {
    /// The flag that failed to parse.
    pub key: String,
    /// The offending value.
    pub value: String,
}

/// Per-call validation configuration.
///
/// A plain value: validation behavior is a pure function of the policy it is
/// handed, which keeps the orchestrator unit-testable without mutating
/// process state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Global kill switch. When off, every validation returns valid.
    pub enabled: bool,
    /// Fan out per-edge counts concurrently instead of in declaration order.
    pub parallel: bool,
    /// Policy keys of edges excluded from validation.
    disabled_edges: HashSet<String>,
}

impl ValidationPolicy {
    /// Policy with everything on: validation enabled, parallel, all edges.
    pub fn all_enabled() -> Self {
        Self {
            enabled: true,
            parallel: true,
            disabled_edges: HashSet::new(),
        }
    }

    /// Policy with the kill switch off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            parallel: true,
            disabled_edges: HashSet::new(),
        }
    }

    /// Switch to sequential (declaration-order) counting.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Exclude one edge from validation, by policy key (see
    /// [`ReferenceEdge::policy_key`]).
    pub fn disable_edge(mut self, key: impl Into<String>) -> Self {
        self.disabled_edges.insert(key.into());
        self
    }

    /// Re-include a previously excluded edge.
    pub fn enable_edge(mut self, key: &str) -> Self {
        self.disabled_edges.remove(key);
        self
    }

    /// Whether an edge participates in validation under this policy.
    pub fn edge_enabled(&self, edge: &ReferenceEdge) -> bool {
        !self.disabled_edges.contains(&edge.policy_key())
    }

    /// Load the policy from environment variables, strictly.
    ///
    /// Any flag present but unparsable is a [`PolicyError`]; absent flags
    /// default to enabled. The graph supplies the set of per-edge flag names.
    pub fn from_env(graph: &ReferenceGraph) -> Result<Self, PolicyError> {
        let enabled = read_bool_flag("INTEGRITY_VALIDATION_ENABLED", true)?;
        let parallel = read_bool_flag("INTEGRITY_PARALLEL_VALIDATION", true)?;

        let mut disabled_edges = HashSet::new();
        for edge in graph.edges() {
            if !read_bool_flag(&edge_flag_name(edge), true)? {
                disabled_edges.insert(edge.policy_key());
            }
        }

        if !enabled {
            tracing::warn!("Reference validation disabled via INTEGRITY_VALIDATION_ENABLED");
        }

        Ok(Self { enabled, parallel, disabled_edges })
    }

    /// Load the policy from environment variables, treating unparsable flags
    /// as their defaults.
    ///
    /// Each fallback is logged with `tracing::warn!`.
    pub fn from_env_lossy(graph: &ReferenceGraph) -> Self {
        Self::from_env(graph).unwrap_or_else(|err| {
            tracing::warn!(
                key = %err.key,
                value = %err.value,
                "Invalid policy flag, falling back to defaults for all flags"
            );
            Self::all_enabled()
        })
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::all_enabled()
    }
}

/// Environment variable name carrying an edge's toggle.
fn edge_flag_name(edge: &ReferenceEdge) -> String {
    let key: String = edge
        .policy_key()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("INTEGRITY_VALIDATE_{key}")
}

/// Read a boolean flag from the environment, strictly.
fn read_bool_flag(key: &str, default: bool) -> Result<bool, PolicyError> {
    match std::env::var(key) {
        Ok(raw) => parse_bool(&raw).ok_or_else(|| PolicyError {
            key: key.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

/// Parse the accepted boolean spellings.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Process-wide handle to the live policy.
///
/// Cheap to clone; the orchestrator takes a snapshot per call, so a policy
/// update is observed by the next validation without restart.
#[derive(Debug, Clone, Default)]
pub struct SharedPolicy {
    inner: Arc<RwLock<ValidationPolicy>>,
}

impl SharedPolicy {
    /// Wrap a policy value.
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { inner: Arc::new(RwLock::new(policy)) }
    }

    /// Clone the current policy value.
    pub fn snapshot(&self) -> ValidationPolicy {
        self.inner.read().clone()
    }

    /// Replace the current policy.
    pub fn replace(&self, policy: ValidationPolicy) {
        *self.inner.write() = policy;
    }

    /// Apply an in-place update to the current policy.
    pub fn update(&self, f: impl FnOnce(&mut ValidationPolicy)) {
        f(&mut self.inner.write());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cardinality, EntityType};

    fn protocol_edge() -> ReferenceEdge {
        ReferenceEdge::new(
            EntityType::Source,
            EntityType::Protocol,
            "protocolId",
            Cardinality::Single,
        )
    }

    #[test]
    fn test_edge_toggle() {
        let edge = protocol_edge();
        let policy = ValidationPolicy::all_enabled();
        assert!(policy.edge_enabled(&edge));

        let policy = policy.disable_edge(edge.policy_key());
        assert!(!policy.edge_enabled(&edge));

        let policy = policy.enable_edge(&edge.policy_key());
        assert!(policy.edge_enabled(&edge));
    }

    #[test]
    fn test_parse_bool_spellings() {
        for s in ["true", "TRUE", "1", "yes", "on", " On "] {
            assert_eq!(parse_bool(s), Some(true), "{s:?}");
        }
        for s in ["false", "0", "No", "off"] {
            assert_eq!(parse_bool(s), Some(false), "{s:?}");
        }
        assert_eq!(parse_bool("enabled"), None);
    }

    #[test]
    fn test_edge_flag_name() {
        assert_eq!(
            edge_flag_name(&protocol_edge()),
            "INTEGRITY_VALIDATE_SOURCES_PROTOCOLID"
        );
    }

    #[test]
    fn test_shared_policy_snapshot_sees_updates() {
        let shared = SharedPolicy::new(ValidationPolicy::all_enabled());
        assert!(shared.snapshot().enabled);

        shared.update(|p| p.enabled = false);
        assert!(!shared.snapshot().enabled);
    }
}
