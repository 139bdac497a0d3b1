//! Serde model of the declarative topology document.
//!
//! The document is a nested YAML mapping describing one cluster: its
//! networks, subnets grouped by region and CIDR, and the instances that run
//! in them. Ambiguous shapes allowed by the format (a single network block
//! vs. a list of them, CSV strings vs. lists for tag values) are captured
//! here so downstream code never sees them.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{constants::DEFAULT_VOLUME_SIZE, is_default};

/// Root of a topology document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClusterDocument {
    pub cluster_name: String,

    /// Free-form tags attached to the cluster itself. Values are opaque to
    /// the builder and carried through to regeneration untouched.
    pub cluster_tags: BTreeMap<String, serde_yaml::Value>,

    /// One network block, or a list of them. A document describing exactly
    /// one network uses the single-mapping form; regeneration preserves the
    /// asymmetry so its output re-parses.
    #[serde(rename = "ec2_vpc")]
    pub network: NetworkBlock,

    /// Subnets keyed by region name, then by CIDR.
    #[serde(rename = "ec2_vpc_subnets", default)]
    pub subnets: BTreeMap<String, BTreeMap<String, SubnetDef>>,

    pub instances: Vec<InstanceDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum NetworkBlock {
    One(NetworkDef),
    Many(Vec<NetworkDef>),
}

impl NetworkBlock {
    pub fn defs(&self) -> &[NetworkDef] {
        match self {
            NetworkBlock::One(def) => std::slice::from_ref(def),
            NetworkBlock::Many(defs) => defs,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkDef {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubnetDef {
    /// Availability zone the subnet lives in.
    pub az: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InstanceDef {
    /// Declared node id, used only to derive a default display name.
    pub node: u64,

    #[serde(rename = "type")]
    pub instance_type: String,

    /// Informational; the authoritative region comes from the subnet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// CIDR of the subnet the instance runs in. May name a CIDR absent from
    /// the subnet block, in which case an implicit subnet is inferred.
    pub subnet: String,

    #[serde(default)]
    pub tags: BTreeMap<String, TagValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeDef>,

    #[serde(default, skip_serializing_if = "is_default")]
    pub assign_eip: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VolumeDef {
    pub device_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,

    #[serde(
        default = "default_volume_size",
        deserialize_with = "size_from_string_or_number"
    )]
    pub volume_size: String,

    #[serde(default = "default_true")]
    pub delete_on_termination: bool,

    /// EC2 ephemeral disk marker, e.g. `ephemeral0`. Its presence overrides
    /// the declared volume type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral: Option<String>,
}

/// A tag value as written in the document: a plain string or a list of
/// strings. Multi-valued tags (notably `role`) may use either a CSV string
/// or the expanded list form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum TagValue {
    One(String),
    Many(Vec<String>),
}

impl TagValue {
    /// Normalizes the value into an ordered sequence of trimmed, non-empty
    /// names. The string form is split on commas.
    pub fn as_list(&self) -> Vec<String> {
        let parts: Vec<&str> = match self {
            TagValue::One(s) => s.split(',').collect(),
            TagValue::Many(items) => items.iter().map(String::as_str).collect(),
        };
        parts
            .into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The value as a single string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::One(s) => Some(s),
            TagValue::Many(_) => None,
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::One(value.to_string())
    }
}

fn default_volume_size() -> String {
    DEFAULT_VOLUME_SIZE.into()
}

fn default_true() -> bool {
    true
}

/// Accepts `volume_size: 16` as well as `volume_size: "16"`.
fn size_from_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}
