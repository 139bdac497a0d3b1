//! Topology document parser.
//!
//! Walks a [`ClusterDocument`] and materializes it into graph entities:
//! cluster, networks, subnets (explicit and inferred), instances, roles,
//! volumes, and finally the declared and implicit role links. All state
//! keyed across the walk (the subnet map, the role table, the index
//! registries, the pending edge list) lives in the [`ParseSession`] so one
//! parse has no effect on the next.

use std::collections::BTreeMap;

use log::{debug, info};
use uuid::Uuid;

use lattice_api::{
    constants::{
        DEFAULT_NODE_NAME_PREFIX, DN_LIST_TAG, DN_REPLICA_LIST_TAG, EPHEMERAL_VOLUME_TYPE,
        NAME_TAG, OS_TAG, ROLE_TAG,
    },
    document::{ClusterDocument, InstanceDef, TagValue, VolumeDef},
    error::{ConfigError, EntityKind},
    model::{Cluster, Credential, Instance, Network, Provider, Role, Subnet, Tenant, Volume},
};

use crate::store::EntityStore;

use super::{links, roles, synth, RoleKey};

pub(crate) struct ParseSession<'a> {
    pub(crate) store: &'a mut dyn EntityStore,
    pub(crate) tenant: Tenant,
    pub(crate) provider: Provider,
    pub(crate) credential: Credential,

    /// Subnets seen so far, keyed by CIDR.
    pub(crate) subnets: BTreeMap<String, Subnet>,
    /// All roles created so far, keyed by (instance name, role name).
    pub(crate) roles: BTreeMap<RoleKey, Role>,
    /// Declared edges awaiting the resolution pass.
    pub(crate) pending_links: Vec<links::PendingLink>,

    // Index registries and role collections for the implicit topology pass.
    pub(crate) dn_roles: BTreeMap<String, Role>,
    pub(crate) dnr_roles: BTreeMap<String, Role>,
    pub(crate) gtm_roles: Vec<Role>,
    pub(crate) coord_roles: Vec<Role>,
}

impl<'a> ParseSession<'a> {
    pub(crate) fn new(
        store: &'a mut dyn EntityStore,
        tenant: Tenant,
        provider: Provider,
        credential: Credential,
    ) -> Self {
        ParseSession {
            store,
            tenant,
            provider,
            credential,
            subnets: BTreeMap::new(),
            roles: BTreeMap::new(),
            pending_links: Vec::new(),
            dn_roles: BTreeMap::new(),
            dnr_roles: BTreeMap::new(),
            gtm_roles: Vec::new(),
            coord_roles: Vec::new(),
        }
    }

    pub(crate) fn build(mut self, doc: &ClusterDocument) -> Result<Cluster, ConfigError> {
        let cluster = Cluster {
            id: Uuid::new_v4(),
            tenant: self.tenant.id,
            name: doc.cluster_name.clone(),
            tags: doc.cluster_tags.clone(),
        };
        self.store.add_cluster(cluster.clone());

        let network_defs = doc.network.defs();
        if network_defs.is_empty() {
            return Err(ConfigError::ParseDocument {
                reason: "network block lists no networks".into(),
            });
        }
        let mut networks = Vec::with_capacity(network_defs.len());
        for def in network_defs {
            let network = Network {
                id: Uuid::new_v4(),
                cluster: cluster.id,
                provider: self.provider.id,
                name: def.name.clone(),
            };
            self.store.add_network(network.clone());
            networks.push(network);
        }

        for (region_name, region_subnets) in &doc.subnets {
            let region = self.store.region(self.provider.id, region_name).ok_or_else(|| {
                ConfigError::ReferenceNotFound {
                    kind: EntityKind::Region,
                    name: region_name.clone(),
                }
            })?;
            for (cidr, subnet_def) in region_subnets {
                let zone = self.store.zone(region.id, &subnet_def.az).ok_or_else(|| {
                    ConfigError::ReferenceNotFound {
                        kind: EntityKind::Zone,
                        name: subnet_def.az.clone(),
                    }
                })?;
                let subnet = Subnet {
                    id: Uuid::new_v4(),
                    cluster: cluster.id,
                    network: networks[0].id,
                    zone: zone.id,
                    credential: self.credential.id,
                    cidr: cidr.clone(),
                };
                self.store.add_subnet(subnet.clone());
                self.subnets.insert(cidr.clone(), subnet);
            }
        }

        for instance_def in &doc.instances {
            self.build_instance(instance_def)?;
        }

        links::resolve(&mut *self.store, &self.roles, &self.pending_links);
        synth::synthesize(
            &mut *self.store,
            &self.dn_roles,
            &self.dnr_roles,
            &self.gtm_roles,
            &self.coord_roles,
        )?;

        info!(
            "Built cluster '{}': {} subnets, {} instances, {} roles",
            cluster.name,
            self.subnets.len(),
            doc.instances.len(),
            self.roles.len()
        );
        Ok(cluster)
    }

    fn build_instance(&mut self, def: &InstanceDef) -> Result<(), ConfigError> {
        let subnet = match self.subnets.get(&def.subnet) {
            Some(subnet) => subnet.clone(),
            None => self.infer_subnet(&def.subnet)?,
        };

        let name = def
            .tags
            .get(NAME_TAG)
            .and_then(TagValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{DEFAULT_NODE_NAME_PREFIX}{}", def.node));

        let instance_type = self
            .store
            .instance_type(subnet.zone, &def.instance_type)
            .ok_or_else(|| ConfigError::ReferenceNotFound {
                kind: EntityKind::InstanceType,
                name: def.instance_type.clone(),
            })?;

        let instance = Instance {
            id: Uuid::new_v4(),
            subnet: subnet.id,
            name,
            instance_type: instance_type.name,
            assign_eip: def.assign_eip,
            tags: retained_tags(&def.tags),
        };
        self.store.add_instance(instance.clone());

        let declared_roles = roles::expand(self, &instance, &def.tags)?;
        links::collect(&instance, &def.tags, &declared_roles, &mut self.pending_links);

        for volume_def in &def.volumes {
            self.build_volume(&instance, volume_def)?;
        }

        Ok(())
    }

    /// Creates an implicit subnet for a CIDR absent from the subnet block,
    /// inheriting zone, network, and credential from an arbitrary existing
    /// subnet. With no subnet to inherit from, the reference cannot be
    /// satisfied.
    fn infer_subnet(&mut self, cidr: &str) -> Result<Subnet, ConfigError> {
        let donor =
            self.subnets
                .values()
                .next()
                .cloned()
                .ok_or_else(|| ConfigError::ReferenceNotFound {
                    kind: EntityKind::Subnet,
                    name: cidr.to_string(),
                })?;
        debug!("Creating implicit subnet '{cidr}' in zone of '{}'", donor.cidr);

        let subnet = Subnet {
            id: Uuid::new_v4(),
            cluster: donor.cluster,
            network: donor.network,
            zone: donor.zone,
            credential: donor.credential,
            cidr: cidr.to_string(),
        };
        self.store.add_subnet(subnet.clone());
        self.subnets.insert(cidr.to_string(), subnet.clone());
        Ok(subnet)
    }

    fn build_volume(&mut self, instance: &Instance, def: &VolumeDef) -> Result<(), ConfigError> {
        let type_name = match (&def.ephemeral, &def.volume_type) {
            (Some(_), _) => EPHEMERAL_VOLUME_TYPE,
            (None, Some(volume_type)) => volume_type.as_str(),
            (None, None) => {
                return Err(ConfigError::ParseDocument {
                    reason: format!(
                        "volume '{}' on instance '{}' declares no volume_type",
                        def.device_name, instance.name
                    ),
                })
            }
        };
        let volume_type = self
            .store
            .volume_type(self.provider.id, type_name)
            .ok_or_else(|| ConfigError::ReferenceNotFound {
                kind: EntityKind::VolumeType,
                name: type_name.to_string(),
            })?;

        self.store.add_volume(Volume {
            id: Uuid::new_v4(),
            instance: instance.id,
            name: def.device_name.clone(),
            volume_type: volume_type.name,
            size: def.volume_size.clone(),
            delete_on_termination: def.delete_on_termination,
            ephemeral: def.ephemeral.clone(),
        });
        Ok(())
    }
}

/// Tags carried through to the instance entity: everything the build did
/// not consume. Role declarations, index lists, naming, and relationship
/// tags are all reconstructed by the generator, so retaining them here
/// would duplicate them on regeneration.
fn retained_tags(tags: &BTreeMap<String, TagValue>) -> BTreeMap<String, TagValue> {
    tags.iter()
        .filter(|(name, _)| {
            !matches!(
                name.as_str(),
                NAME_TAG | ROLE_TAG | OS_TAG | DN_LIST_TAG | DN_REPLICA_LIST_TAG
            ) && !links::is_relationship_tag(name)
                && !synth::IMPLICIT_RELATIONSHIPS.contains(&name.as_str())
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::{
        engine::testutil::{sample_document, seeded_store},
        store::MemoryStore,
    };

    use super::*;

    fn build(store: &mut MemoryStore, yaml: &str) -> Result<Cluster, ConfigError> {
        let doc: ClusterDocument = serde_yaml::from_str(yaml).unwrap();
        let tenant = store.tenant_by_name("acme").unwrap();
        let provider = store.provider_by_name("EC2").unwrap();
        let credential = store.credential_for(tenant.id, provider.id).unwrap();
        ParseSession::new(store, tenant, provider, credential).build(&doc)
    }

    #[test]
    fn test_build_full_document() {
        let mut store = seeded_store();
        let cluster = build(&mut store, sample_document()).unwrap();

        assert_eq!(cluster.name, "speedy");
        assert_eq!(store.networks_in(cluster.id).len(), 1);
        assert_eq!(store.subnets_in(cluster.id).len(), 2);

        let instances = store.instances_in(cluster.id);
        let names: Vec<&str> = instances.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["speedy-a", "speedy-b", "node-3", "node-4", "node-5", "node-6"]
        );

        // The replica's upstream and backup links both resolved, plus the
        // primary's backup link.
        let replica = &instances[1];
        let replica_roles = store.roles_of(replica.id);
        assert_eq!(replica_roles.len(), 1);
        let links = store.client_links_of(replica_roles[0].id);
        let mut link_names: Vec<&str> = links.iter().map(|l| l.name.as_str()).collect();
        link_names.sort();
        assert_eq!(link_names, vec!["backup", "upstream"]);
    }

    #[test]
    fn test_implicit_subnet_inference() {
        let mut store = seeded_store();
        let cluster = build(
            &mut store,
            indoc! {r#"
                cluster_name: speedy
                cluster_tags: {}
                ec2_vpc:
                  Name: Test
                ec2_vpc_subnets:
                  eu-west-1:
                    10.33.29.0/28:
                      az: eu-west-1a
                instances:
                  - node: 1
                    type: t3.micro
                    subnet: 10.33.99.0/28
                    tags: {}
            "#},
        )
        .unwrap();

        let subnets = store.subnets_in(cluster.id);
        assert_eq!(subnets.len(), 2);
        let implicit = subnets.iter().find(|s| s.cidr == "10.33.99.0/28").unwrap();
        let explicit = subnets.iter().find(|s| s.cidr == "10.33.29.0/28").unwrap();
        assert_eq!(implicit.zone, explicit.zone);
        assert_eq!(implicit.network, explicit.network);
    }

    #[test]
    fn test_inference_requires_an_existing_subnet() {
        let mut store = seeded_store();
        let err = build(
            &mut store,
            indoc! {r#"
                cluster_name: speedy
                cluster_tags: {}
                ec2_vpc:
                  Name: Test
                instances:
                  - node: 1
                    type: t3.micro
                    subnet: 10.33.99.0/28
                    tags: {}
            "#},
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ReferenceNotFound {
                kind: EntityKind::Subnet,
                name: "10.33.99.0/28".into(),
            }
        );
    }

    #[test]
    fn test_unknown_instance_type_is_fatal() {
        let mut store = seeded_store();
        let err = build(
            &mut store,
            indoc! {r#"
                cluster_name: speedy
                cluster_tags: {}
                ec2_vpc:
                  Name: Test
                ec2_vpc_subnets:
                  eu-west-1:
                    10.33.29.0/28:
                      az: eu-west-1a
                instances:
                  - node: 1
                    type: z9.gigantic
                    subnet: 10.33.29.0/28
                    tags: {}
            "#},
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ReferenceNotFound {
                kind: EntityKind::InstanceType,
                name: "z9.gigantic".into(),
            }
        );
    }

    #[test]
    fn test_volume_creation() {
        let mut store = seeded_store();
        let cluster = build(
            &mut store,
            indoc! {r#"
                cluster_name: speedy
                cluster_tags: {}
                ec2_vpc:
                  Name: Test
                ec2_vpc_subnets:
                  eu-west-1:
                    10.33.29.0/28:
                      az: eu-west-1a
                instances:
                  - node: 1
                    type: t3.micro
                    subnet: 10.33.29.0/28
                    tags: {}
                    volumes:
                      - device_name: /dev/xvdf
                        volume_type: gp2
                        volume_size: 16
                      - device_name: /dev/xvdb
                        ephemeral: ephemeral0
            "#},
        )
        .unwrap();

        let instance = &store.instances_in(cluster.id)[0];
        let volumes = store.volumes_of(instance.id);
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].volume_type, "gp2");
        assert_eq!(volumes[0].size, "16");
        assert!(volumes[0].delete_on_termination);
        assert_eq!(volumes[1].volume_type, "ephemeral");
        assert_eq!(volumes[1].size, "0");
        assert_eq!(volumes[1].ephemeral.as_deref(), Some("ephemeral0"));
    }

    #[test]
    fn test_consumed_tags_are_not_retained() {
        let mut store = seeded_store();
        let cluster = build(
            &mut store,
            indoc! {r#"
                cluster_name: speedy
                cluster_tags: {}
                ec2_vpc:
                  Name: Test
                ec2_vpc_subnets:
                  eu-west-1:
                    10.33.29.0/28:
                      az: eu-west-1a
                instances:
                  - node: 1
                    type: t3.micro
                    subnet: 10.33.29.0/28
                    tags:
                      Name: speedy-a
                      role: primary
                      backup: node-3
                      Owner: dba
            "#},
        )
        .unwrap();

        let instance = &store.instances_in(cluster.id)[0];
        assert_eq!(instance.name, "speedy-a");
        let retained: Vec<&str> = instance.tags.keys().map(String::as_str).collect();
        assert_eq!(retained, vec!["Owner"]);
    }
}
