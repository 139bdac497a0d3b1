//! Declared relationship collection and deferred resolution.
//!
//! Relationship tags reference roles on other instances by name, and those
//! roles may not exist yet when the tag is read. Collection therefore only
//! records pending edge descriptors during the instance walk; resolution
//! runs once, after the whole role table is known.

use std::collections::BTreeMap;

use log::{debug, warn};

use lattice_api::{
    document::TagValue,
    model::{Instance, Role, RoleLink},
};

use crate::store::EntityStore;

use super::RoleKey;

/// One row of the relationship table: which tag names the relationship,
/// which role family on the declaring instance sits on the client side of
/// the resulting link, and which family on the target instance sits on the
/// server side. The server family is always the link's server, no matter
/// which side the connection is initiated from at runtime (barman, for
/// instance, dials out to the node it backs up).
pub(crate) struct LinkRule {
    pub relationship: &'static str,
    pub client_role: &'static str,
    pub server_role: &'static str,
}

const fn rule(
    relationship: &'static str,
    client_role: &'static str,
    server_role: &'static str,
) -> LinkRule {
    LinkRule {
        relationship,
        client_role,
        server_role,
    }
}

/// Every declared relationship the parser understands. Streaming
/// replication and backup for the base topology, plus the backup, log, and
/// control relationships of the extended (bdr) topology.
pub(crate) const LINK_RULES: &[LinkRule] = &[
    rule("upstream", "replica", "primary"),
    rule("upstream", "replica", "replica"),
    rule("backup", "replica", "barman"),
    rule("backup", "primary", "barman"),
    rule("backup", "bdr", "barman"),
    rule("log", "bdr", "log-server"),
    rule("control", "bdr", "control"),
];

/// Returns true if `tag` is one of the declared relationship tag names.
pub(crate) fn is_relationship_tag(tag: &str) -> bool {
    LINK_RULES.iter().any(|r| r.relationship == tag)
}

/// An edge awaiting resolution: endpoints are still (instance name, role
/// name) pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingLink {
    pub relationship: &'static str,
    pub client_instance: String,
    pub client_role: &'static str,
    pub server_instance: String,
    pub server_role: &'static str,
}

/// Records a pending edge for every table row whose relationship tag is
/// present on the instance and whose client family is among the instance's
/// declared roles.
pub(crate) fn collect(
    instance: &Instance,
    tags: &BTreeMap<String, TagValue>,
    declared_roles: &[String],
    pending: &mut Vec<PendingLink>,
) {
    for rule in LINK_RULES {
        let Some(target) = tags.get(rule.relationship) else {
            continue;
        };
        if !declared_roles.iter().any(|name| name == rule.client_role) {
            continue;
        }
        let Some(target_name) = target.as_str() else {
            warn!(
                "Ignoring '{}' tag on instance '{}': expected a single instance name",
                rule.relationship, instance.name
            );
            continue;
        };
        pending.push(PendingLink {
            relationship: rule.relationship,
            client_instance: instance.name.clone(),
            client_role: rule.client_role,
            server_instance: target_name.to_string(),
            server_role: rule.server_role,
        });
    }
}

/// Resolution pass. Edges whose server-side role does not exist are dropped
/// with a diagnostic rather than failing the build: partially-specified
/// topologies are tolerated.
pub(crate) fn resolve(
    store: &mut dyn EntityStore,
    roles: &BTreeMap<RoleKey, Role>,
    pending: &[PendingLink],
) {
    for link in pending {
        let server_key = (link.server_instance.clone(), link.server_role.to_string());
        let Some(server) = roles.get(&server_key) else {
            warn!(
                "Skipping '{}' link from '{}' ({}): no '{}' role on instance '{}'",
                link.relationship,
                link.client_instance,
                link.client_role,
                link.server_role,
                link.server_instance
            );
            continue;
        };

        let client_key = (link.client_instance.clone(), link.client_role.to_string());
        let Some(client) = roles.get(&client_key) else {
            debug!(
                "Skipping '{}' link: no '{}' role on instance '{}'",
                link.relationship, link.client_role, link.client_instance
            );
            continue;
        };

        store.add_role_link(RoleLink::new(link.relationship, server.id, client.id));
    }
}

#[cfg(test)]
mod tests {
    use maplit::btreemap;
    use uuid::Uuid;

    use crate::store::MemoryStore;

    use super::*;

    fn instance(name: &str) -> Instance {
        Instance {
            id: Uuid::new_v4(),
            subnet: Uuid::new_v4(),
            name: name.into(),
            instance_type: "t3.micro".into(),
            assign_eip: false,
            tags: BTreeMap::new(),
        }
    }

    fn role_table(entries: &[(&str, &str)]) -> BTreeMap<RoleKey, Role> {
        entries
            .iter()
            .map(|(instance_name, role_name)| {
                (
                    (instance_name.to_string(), role_name.to_string()),
                    Role::new(Uuid::new_v4(), *role_name, *role_name),
                )
            })
            .collect()
    }

    #[test]
    fn test_collect_requires_declared_client_role() {
        let tags = btreemap! {
            "upstream".to_string() => TagValue::from("node-1"),
        };
        let mut pending = Vec::new();

        // Tag present, but the instance is not a replica.
        collect(
            &instance("node-2"),
            &tags,
            &["barman".to_string()],
            &mut pending,
        );
        assert!(pending.is_empty());

        collect(
            &instance("node-2"),
            &tags,
            &["replica".to_string()],
            &mut pending,
        );
        assert_eq!(pending.len(), 2); // replica -> primary and replica -> replica
        assert!(pending.iter().all(|p| p.server_instance == "node-1"));
    }

    #[test]
    fn test_resolve_drops_dangling_server() {
        let roles = role_table(&[("node-2", "replica")]);
        let pending = vec![PendingLink {
            relationship: "backup",
            client_instance: "node-2".into(),
            client_role: "replica",
            server_instance: "node-3".into(),
            server_role: "barman",
        }];

        let mut store = MemoryStore::new();
        resolve(&mut store, &roles, &pending);
        assert_eq!(store.role_link_count(), 0);
    }

    #[test]
    fn test_backup_server_side_is_barman() {
        // The backup tag is written on the replica, but barman is always the
        // server side of the resulting link.
        let roles = role_table(&[("node-2", "replica"), ("node-3", "barman")]);
        let pending = vec![PendingLink {
            relationship: "backup",
            client_instance: "node-2".into(),
            client_role: "replica",
            server_instance: "node-3".into(),
            server_role: "barman",
        }];

        let mut store = MemoryStore::new();
        resolve(&mut store, &roles, &pending);

        let barman = &roles[&("node-3".to_string(), "barman".to_string())];
        let replica = &roles[&("node-2".to_string(), "replica".to_string())];
        let link = store.client_links_of(replica.id).pop().unwrap();
        assert_eq!(link.name, "backup");
        assert_eq!(link.server_role, barman.id);
        assert_eq!(link.client_role, replica.id);
    }
}
