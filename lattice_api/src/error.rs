//! Errors raised while building an entity graph from a topology document.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Kinds of entity the builder looks up in the store. Used to name the
/// missing entity in [`ConfigError::ReferenceNotFound`].
#[derive(Display, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Tenant,
    Provider,
    Credential,
    Region,
    Zone,
    InstanceType,
    VolumeType,
    Subnet,
    Instance,
    Role,
}

/// Identifies errors detected while translating a topology document into an
/// entity graph, or while regenerating a document from a graph. All variants
/// are fatal and abort the enclosing store transaction; edges whose target
/// role cannot be resolved are deliberately not errors (they are dropped
/// with a diagnostic).
#[derive(thiserror::Error, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigError {
    #[error("No {kind} found matching '{name}'")]
    ReferenceNotFound { kind: EntityKind, name: String },

    #[error("Failed to parse topology document: {reason}")]
    ParseDocument { reason: String },

    #[error("Failed to render topology document: {reason}")]
    RenderDocument { reason: String },

    #[error("Instance '{instance}' declares role '{family}' but tag '{tag}' lists no indices")]
    EmptyIndexList {
        instance: String,
        family: String,
        tag: String,
    },

    #[error("{family} index '{index}' is already taken, redeclared by instance '{instance}'")]
    IndexConflict {
        family: String,
        index: String,
        instance: String,
    },

    #[error("datanode-replica index '{index}' has no matching datanode")]
    UnmatchedReplicaIndex { index: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_not_found_display() {
        let err = ConfigError::ReferenceNotFound {
            kind: EntityKind::InstanceType,
            name: "t3.micro".into(),
        };
        assert_eq!(err.to_string(), "No instance-type found matching 't3.micro'");
    }

    #[test]
    fn test_index_conflict_display() {
        let err = ConfigError::IndexConflict {
            family: "datanode".into(),
            index: "2".into(),
            instance: "node-4".into(),
        };
        assert_eq!(
            err.to_string(),
            "datanode index '2' is already taken, redeclared by instance 'node-4'"
        );
    }
}
