//! Event Store Errors
//!
//! Error types for event store operations.

/// Errors that can occur in the event store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventStoreError {
    /// History failed contiguity or hash-linkage checks
    #[error(
        "Chain integrity violated for {entity_id} between versions {} and {version}: {reason}",
        version_label(.previous_version)
    )]
    ChainIntegrity {
        entity_id: String,
        previous_version: Option<i64>,
        version: i64,
        reason: String,
    },

    /// An event for this entity and version is already recorded
    #[error("Event already recorded for {entity_id} at version {version}")]
    DuplicateVersion { entity_id: String, version: i64 },
}

fn version_label(version: &Option<i64>) -> String {
    version.map_or_else(|| "start".to_string(), |v| v.to_string())
}

impl EventStoreError {
    /// Check if this error indicates corrupted history
    pub fn is_chain_integrity_violation(&self) -> bool {
        matches!(self, EventStoreError::ChainIntegrity { .. })
    }

    /// The `(previous, current)` version pair that broke the chain
    pub fn offending_versions(&self) -> Option<(Option<i64>, i64)> {
        match self {
            EventStoreError::ChainIntegrity {
                previous_version,
                version,
                ..
            } => Some((*previous_version, *version)),
            EventStoreError::DuplicateVersion { .. } => None,
        }
    }
}
