//! Entity model for the cluster graph.
//!
//! Reference data (tenants, providers, regions, zones, instance and volume
//! types, credentials) is looked up, never created, by the document builder;
//! everything else is owned transitively by its [`Cluster`] and created in
//! one transaction. Entities carry plain ids rather than references so the
//! store stays the single owner of the graph.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::document::TagValue;

// Reference data

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: Uuid,
    pub tenant: Uuid,
    pub provider: Uuid,
    pub name: String,
    pub shared_identity: String,
    pub shared_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub id: Uuid,
    pub provider: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: Uuid,
    pub region: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceType {
    pub id: Uuid,
    pub zone: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeType {
    pub id: Uuid,
    pub provider: Uuid,
    pub name: String,
}

// Cluster-owned entities

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: Uuid,
    pub tenant: Uuid,
    pub name: String,
    pub tags: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub id: Uuid,
    pub cluster: Uuid,
    pub provider: Uuid,
    pub name: String,
}

/// A subnet's name doubles as its CIDR, the natural key within a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub id: Uuid,
    pub cluster: Uuid,
    pub network: Uuid,
    pub zone: Uuid,
    pub credential: Uuid,
    pub cidr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: Uuid,
    pub subnet: Uuid,
    pub name: String,
    pub instance_type: String,
    pub assign_eip: bool,
    /// Free-form tags not consumed during the build, retained so the
    /// generator can reproduce them.
    pub tags: BTreeMap<String, TagValue>,
}

/// A named function an instance performs in the cluster. `name` may carry an
/// index suffix (`datanode-3`) while `role_type` is always the base family
/// (`datanode`). The pair (owning instance name, role name) is unique within
/// one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: Uuid,
    pub instance: Uuid,
    pub name: String,
    pub role_type: String,
}

/// Directed relationship between two roles. Not deduplicated: several links
/// may share a name across different role pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleLink {
    pub id: Uuid,
    pub name: String,
    pub server_role: Uuid,
    pub client_role: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub id: Uuid,
    pub instance: Uuid,
    /// Device identifier, e.g. `/dev/xvdf`.
    pub name: String,
    pub volume_type: String,
    pub size: String,
    pub delete_on_termination: bool,
    /// EC2 ephemeral disk marker, when present.
    pub ephemeral: Option<String>,
}

impl Role {
    pub fn new(instance: Uuid, name: impl Into<String>, role_type: impl Into<String>) -> Self {
        Role {
            id: Uuid::new_v4(),
            instance,
            name: name.into(),
            role_type: role_type.into(),
        }
    }
}

impl RoleLink {
    pub fn new(name: impl Into<String>, server_role: Uuid, client_role: Uuid) -> Self {
        RoleLink {
            id: Uuid::new_v4(),
            name: name.into(),
            server_role,
            client_role,
        }
    }
}
