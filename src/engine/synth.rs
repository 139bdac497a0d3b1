//! Implicit fan-out links for the distributed (multi-coordinator) topology.
//!
//! None of these edges appear in the document: they follow mechanically
//! from the role collections, so they are derived here by cross-product
//! once all roles are known, and re-derived on every parse. The generator
//! correspondingly never writes them back out.

use std::collections::BTreeMap;

use lattice_api::{
    constants::{COORDINATOR_FAMILY, DATANODE_REPLICA_FAMILY, GTM_FAMILY},
    error::ConfigError,
    model::{Role, RoleLink},
};

use crate::store::EntityStore;

/// Relationship names synthesized here rather than declared in documents.
pub(crate) const IMPLICIT_RELATIONSHIPS: &[&str] =
    &[GTM_FAMILY, COORDINATOR_FAMILY, DATANODE_REPLICA_FAMILY];

/// Derives the fixed fan-out edges: every datanode-replica links to its
/// same-indexed datanode and to every coordinator, every datanode links to
/// every coordinator, and every coordinator links to every gtm. Empty role
/// collections simply produce no edges.
pub(crate) fn synthesize(
    store: &mut dyn EntityStore,
    dn_roles: &BTreeMap<String, Role>,
    dnr_roles: &BTreeMap<String, Role>,
    gtm_roles: &[Role],
    coord_roles: &[Role],
) -> Result<(), ConfigError> {
    for (index, replica) in dnr_roles {
        let datanode = dn_roles
            .get(index)
            .ok_or_else(|| ConfigError::UnmatchedReplicaIndex {
                index: index.clone(),
            })?;
        store.add_role_link(RoleLink::new(
            DATANODE_REPLICA_FAMILY,
            datanode.id,
            replica.id,
        ));

        for coordinator in coord_roles {
            store.add_role_link(RoleLink::new(
                COORDINATOR_FAMILY,
                coordinator.id,
                replica.id,
            ));
        }
    }

    for datanode in dn_roles.values() {
        for coordinator in coord_roles {
            store.add_role_link(RoleLink::new(
                COORDINATOR_FAMILY,
                coordinator.id,
                datanode.id,
            ));
        }
    }

    for coordinator in coord_roles {
        for gtm in gtm_roles {
            store.add_role_link(RoleLink::new(GTM_FAMILY, gtm.id, coordinator.id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::store::MemoryStore;

    use super::*;

    fn role(name: &str, family: &str) -> Role {
        Role::new(Uuid::new_v4(), name, family)
    }

    #[test]
    fn test_coordinator_gtm_fan_out() {
        let coordinators = vec![
            role("coordinator", "coordinator"),
            role("coordinator", "coordinator"),
        ];
        let gtms = vec![role("gtm", "gtm")];

        let mut store = MemoryStore::new();
        synthesize(
            &mut store,
            &BTreeMap::new(),
            &BTreeMap::new(),
            &gtms,
            &coordinators,
        )
        .unwrap();

        // One gtm link per coordinator, each with the gtm role as server.
        assert_eq!(store.role_link_count(), 2);
        for coordinator in &coordinators {
            let links = store.client_links_of(coordinator.id);
            assert_eq!(links.len(), 1);
            assert_eq!(links[0].name, "gtm");
            assert_eq!(links[0].server_role, gtms[0].id);
        }
    }

    #[test]
    fn test_replica_links_to_same_indexed_datanode() {
        let dn: BTreeMap<String, Role> = [
            ("1".to_string(), role("datanode-1", "datanode")),
            ("2".to_string(), role("datanode-2", "datanode")),
        ]
        .into();
        let dnr: BTreeMap<String, Role> =
            [("2".to_string(), role("datanode-replica-2", "datanode-replica"))].into();

        let mut store = MemoryStore::new();
        synthesize(&mut store, &dn, &dnr, &[], &[]).unwrap();

        let links = store.client_links_of(dnr["2"].id);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].name, "datanode-replica");
        assert_eq!(links[0].server_role, dn["2"].id);
    }

    #[test]
    fn test_unmatched_replica_index_is_fatal() {
        let dnr: BTreeMap<String, Role> =
            [("7".to_string(), role("datanode-replica-7", "datanode-replica"))].into();

        let mut store = MemoryStore::new();
        let err = synthesize(&mut store, &BTreeMap::new(), &dnr, &[], &[]).unwrap_err();
        assert_eq!(err, ConfigError::UnmatchedReplicaIndex { index: "7".into() });
    }

    #[test]
    fn test_empty_collections_produce_no_edges() {
        let mut store = MemoryStore::new();
        synthesize(&mut store, &BTreeMap::new(), &BTreeMap::new(), &[], &[]).unwrap();
        assert_eq!(store.role_link_count(), 0);
    }
}
