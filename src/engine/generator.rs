//! Topology document regeneration.
//!
//! The inverse walk: reads one cluster's graph and reconstructs a document
//! that, re-parsed, yields an equivalent graph. Output is not byte-stable
//! against the original input; node ids are reassigned positionally over
//! the store's creation-ordered instance scan.

use lattice_api::{
    constants::{
        DATANODE_FAMILY, DATANODE_REPLICA_FAMILY, DEFAULT_OS_TAG, DN_LIST_TAG, DN_REPLICA_LIST_TAG,
        NAME_TAG, OS_TAG, ROLE_TAG,
    },
    document::{ClusterDocument, InstanceDef, NetworkBlock, NetworkDef, SubnetDef, TagValue, VolumeDef},
    error::{ConfigError, EntityKind},
    model::{Cluster, Instance, Role},
};

use crate::store::EntityStore;

use super::synth;

pub(crate) fn generate(
    store: &dyn EntityStore,
    cluster: &Cluster,
) -> Result<ClusterDocument, ConfigError> {
    let networks = store.networks_in(cluster.id);
    // A single network renders as one mapping, several as a sequence; the
    // parser accepts both, so the shape survives re-ingestion.
    let network = match networks.as_slice() {
        [single] => NetworkBlock::One(NetworkDef {
            name: single.name.clone(),
        }),
        many => NetworkBlock::Many(
            many.iter()
                .map(|n| NetworkDef {
                    name: n.name.clone(),
                })
                .collect(),
        ),
    };

    let mut subnets: std::collections::BTreeMap<
        String,
        std::collections::BTreeMap<String, SubnetDef>,
    > = Default::default();
    for subnet in store.subnets_in(cluster.id) {
        let zone = lookup(store.zone_by_id(subnet.zone), EntityKind::Zone)?;
        let region = lookup(store.region_by_id(zone.region), EntityKind::Region)?;
        subnets
            .entry(region.name)
            .or_default()
            .insert(subnet.cidr, SubnetDef { az: zone.name });
    }

    let mut instances = Vec::new();
    for (position, instance) in store.instances_in(cluster.id).iter().enumerate() {
        instances.push(generate_instance(store, position as u64 + 1, instance)?);
    }

    Ok(ClusterDocument {
        cluster_name: cluster.name.clone(),
        cluster_tags: cluster.tags.clone(),
        network,
        subnets,
        instances,
    })
}

fn generate_instance(
    store: &dyn EntityStore,
    node: u64,
    instance: &Instance,
) -> Result<InstanceDef, ConfigError> {
    let subnet = lookup(store.subnet_by_id(instance.subnet), EntityKind::Subnet)?;
    let zone = lookup(store.zone_by_id(subnet.zone), EntityKind::Zone)?;
    let region = lookup(store.region_by_id(zone.region), EntityKind::Region)?;
    let roles = store.roles_of(instance.id);

    let mut tags = instance.tags.clone();
    tags.insert(OS_TAG.into(), TagValue::from(DEFAULT_OS_TAG));
    tags.insert(ROLE_TAG.into(), TagValue::Many(distinct_role_types(&roles)));
    tags.insert(NAME_TAG.into(), TagValue::One(instance.name.clone()));

    // Indexed families expand from their list tags, so those must be
    // reconstructed from the role-name suffixes for the document to
    // re-parse into the same roles.
    if let Some(indices) = family_indices(&roles, DATANODE_FAMILY) {
        tags.insert(DN_LIST_TAG.into(), TagValue::One(indices));
    }
    if let Some(indices) = family_indices(&roles, DATANODE_REPLICA_FAMILY) {
        tags.insert(DN_REPLICA_LIST_TAG.into(), TagValue::One(indices));
    }

    for role in &roles {
        for link in store.client_links_of(role.id) {
            if synth::IMPLICIT_RELATIONSHIPS.contains(&link.name.as_str()) {
                continue;
            }
            let server_role = lookup(store.role_by_id(link.server_role), EntityKind::Role)?;
            let server_instance = lookup(
                store.instance_by_id(server_role.instance),
                EntityKind::Instance,
            )?;
            tags.insert(link.name.clone(), TagValue::One(server_instance.name));
        }
    }

    let volumes = store
        .volumes_of(instance.id)
        .into_iter()
        .map(|volume| VolumeDef {
            device_name: volume.name,
            volume_type: Some(volume.volume_type),
            volume_size: volume.size,
            delete_on_termination: volume.delete_on_termination,
            ephemeral: volume.ephemeral,
        })
        .collect();

    Ok(InstanceDef {
        node,
        instance_type: instance.instance_type.clone(),
        region: Some(region.name),
        subnet: subnet.cidr,
        tags,
        volumes,
        assign_eip: instance.assign_eip,
    })
}

/// Role-type names in first-appearance order, indexed families collapsed to
/// one entry.
fn distinct_role_types(roles: &[Role]) -> Vec<String> {
    let mut types = Vec::new();
    for role in roles {
        if !types.contains(&role.role_type) {
            types.push(role.role_type.clone());
        }
    }
    types
}

/// Comma-joined indices of the instance's roles in `family`, if any.
fn family_indices(roles: &[Role], family: &str) -> Option<String> {
    let prefix = format!("{family}-");
    let indices: Vec<&str> = roles
        .iter()
        .filter(|role| role.role_type == family)
        .filter_map(|role| role.name.strip_prefix(&prefix))
        .collect();
    if indices.is_empty() {
        None
    } else {
        Some(indices.join(","))
    }
}

fn lookup<T>(entity: Option<T>, kind: EntityKind) -> Result<T, ConfigError> {
    entity.ok_or_else(|| ConfigError::ReferenceNotFound {
        kind,
        name: "<dangling reference>".into(),
    })
}
