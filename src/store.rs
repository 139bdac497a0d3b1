//! Entity store gateway.
//!
//! The document builder never issues raw queries: it goes through the
//! [`EntityStore`] capability interface for by-key lookups, entity creation,
//! and the transaction boundary. [`MemoryStore`] is the in-process
//! implementation; a deployment backed by a real database would provide its
//! own.

use uuid::Uuid;

use lattice_api::model::{
    Cluster, Credential, Instance, InstanceType, Network, Provider, Region, Role, RoleLink, Subnet,
    Tenant, Volume, VolumeType, Zone,
};

/// Capability interface the builder and generator consume.
///
/// The builder's whole effect must be atomic: callers wrap it in
/// `begin`/`commit`, and `rollback` must leave the store exactly as it was
/// at `begin`. Reads used by the generator return entities in creation
/// order.
pub trait EntityStore {
    // Transaction boundary
    fn begin(&mut self);
    fn commit(&mut self);
    fn rollback(&mut self);

    // Reference data lookups
    fn tenant_by_id(&self, id: Uuid) -> Option<Tenant>;
    fn tenant_by_name(&self, name: &str) -> Option<Tenant>;
    fn provider_by_name(&self, name: &str) -> Option<Provider>;
    fn credential_for(&self, tenant: Uuid, provider: Uuid) -> Option<Credential>;
    fn region(&self, provider: Uuid, name: &str) -> Option<Region>;
    fn zone(&self, region: Uuid, name: &str) -> Option<Zone>;
    fn zone_by_id(&self, id: Uuid) -> Option<Zone>;
    fn region_by_id(&self, id: Uuid) -> Option<Region>;
    fn instance_type(&self, zone: Uuid, name: &str) -> Option<InstanceType>;
    fn volume_type(&self, provider: Uuid, name: &str) -> Option<VolumeType>;

    // Entity creation
    fn add_tenant(&mut self, tenant: Tenant);
    fn add_provider(&mut self, provider: Provider);
    fn add_credential(&mut self, credential: Credential);
    fn add_region(&mut self, region: Region);
    fn add_zone(&mut self, zone: Zone);
    fn add_instance_type(&mut self, instance_type: InstanceType);
    fn add_volume_type(&mut self, volume_type: VolumeType);
    fn add_cluster(&mut self, cluster: Cluster);
    fn add_network(&mut self, network: Network);
    fn add_subnet(&mut self, subnet: Subnet);
    fn add_instance(&mut self, instance: Instance);
    fn add_role(&mut self, role: Role);
    fn add_role_link(&mut self, link: RoleLink);
    fn add_volume(&mut self, volume: Volume);

    // Cluster-scoped reads
    fn networks_in(&self, cluster: Uuid) -> Vec<Network>;
    fn subnets_in(&self, cluster: Uuid) -> Vec<Subnet>;
    fn instances_in(&self, cluster: Uuid) -> Vec<Instance>;
    fn subnet_by_id(&self, id: Uuid) -> Option<Subnet>;
    fn instance_by_id(&self, id: Uuid) -> Option<Instance>;
    fn role_by_id(&self, id: Uuid) -> Option<Role>;
    fn roles_of(&self, instance: Uuid) -> Vec<Role>;
    fn client_links_of(&self, role: Uuid) -> Vec<RoleLink>;
    fn volumes_of(&self, instance: Uuid) -> Vec<Volume>;
}

/// In-memory store. Tables are append-only vectors, so creation order is
/// the iteration order. `begin` snapshots all tables; `rollback` restores
/// the snapshot.
#[derive(Default)]
pub struct MemoryStore {
    tables: Tables,
    snapshot: Option<Box<Tables>>,
}

#[derive(Default, Clone)]
struct Tables {
    tenants: Vec<Tenant>,
    providers: Vec<Provider>,
    credentials: Vec<Credential>,
    regions: Vec<Region>,
    zones: Vec<Zone>,
    instance_types: Vec<InstanceType>,
    volume_types: Vec<VolumeType>,
    clusters: Vec<Cluster>,
    networks: Vec<Network>,
    subnets: Vec<Subnet>,
    instances: Vec<Instance>,
    roles: Vec<Role>,
    role_links: Vec<RoleLink>,
    volumes: Vec<Volume>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cluster_by_name(&self, name: &str) -> Option<Cluster> {
        self.tables.clusters.iter().find(|c| c.name == name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        let t = &self.tables;
        t.clusters.is_empty()
            && t.networks.is_empty()
            && t.subnets.is_empty()
            && t.instances.is_empty()
            && t.roles.is_empty()
            && t.role_links.is_empty()
            && t.volumes.is_empty()
    }

    pub fn role_link_count(&self) -> usize {
        self.tables.role_links.len()
    }
}

impl EntityStore for MemoryStore {
    fn begin(&mut self) {
        self.snapshot = Some(Box::new(self.tables.clone()));
    }

    fn commit(&mut self) {
        self.snapshot = None;
    }

    fn rollback(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.tables = *snapshot;
        }
    }

    fn tenant_by_id(&self, id: Uuid) -> Option<Tenant> {
        self.tables.tenants.iter().find(|t| t.id == id).cloned()
    }

    fn tenant_by_name(&self, name: &str) -> Option<Tenant> {
        self.tables.tenants.iter().find(|t| t.name == name).cloned()
    }

    fn provider_by_name(&self, name: &str) -> Option<Provider> {
        self.tables.providers.iter().find(|p| p.name == name).cloned()
    }

    fn credential_for(&self, tenant: Uuid, provider: Uuid) -> Option<Credential> {
        self.tables
            .credentials
            .iter()
            .find(|c| c.tenant == tenant && c.provider == provider)
            .cloned()
    }

    fn region(&self, provider: Uuid, name: &str) -> Option<Region> {
        self.tables
            .regions
            .iter()
            .find(|r| r.provider == provider && r.name == name)
            .cloned()
    }

    fn zone(&self, region: Uuid, name: &str) -> Option<Zone> {
        self.tables
            .zones
            .iter()
            .find(|z| z.region == region && z.name == name)
            .cloned()
    }

    fn zone_by_id(&self, id: Uuid) -> Option<Zone> {
        self.tables.zones.iter().find(|z| z.id == id).cloned()
    }

    fn region_by_id(&self, id: Uuid) -> Option<Region> {
        self.tables.regions.iter().find(|r| r.id == id).cloned()
    }

    fn instance_type(&self, zone: Uuid, name: &str) -> Option<InstanceType> {
        self.tables
            .instance_types
            .iter()
            .find(|it| it.zone == zone && it.name == name)
            .cloned()
    }

    fn volume_type(&self, provider: Uuid, name: &str) -> Option<VolumeType> {
        self.tables
            .volume_types
            .iter()
            .find(|vt| vt.provider == provider && vt.name == name)
            .cloned()
    }

    fn add_tenant(&mut self, tenant: Tenant) {
        self.tables.tenants.push(tenant);
    }

    fn add_provider(&mut self, provider: Provider) {
        self.tables.providers.push(provider);
    }

    fn add_credential(&mut self, credential: Credential) {
        self.tables.credentials.push(credential);
    }

    fn add_region(&mut self, region: Region) {
        self.tables.regions.push(region);
    }

    fn add_zone(&mut self, zone: Zone) {
        self.tables.zones.push(zone);
    }

    fn add_instance_type(&mut self, instance_type: InstanceType) {
        self.tables.instance_types.push(instance_type);
    }

    fn add_volume_type(&mut self, volume_type: VolumeType) {
        self.tables.volume_types.push(volume_type);
    }

    fn add_cluster(&mut self, cluster: Cluster) {
        self.tables.clusters.push(cluster);
    }

    fn add_network(&mut self, network: Network) {
        self.tables.networks.push(network);
    }

    fn add_subnet(&mut self, subnet: Subnet) {
        self.tables.subnets.push(subnet);
    }

    fn add_instance(&mut self, instance: Instance) {
        self.tables.instances.push(instance);
    }

    fn add_role(&mut self, role: Role) {
        self.tables.roles.push(role);
    }

    fn add_role_link(&mut self, link: RoleLink) {
        self.tables.role_links.push(link);
    }

    fn add_volume(&mut self, volume: Volume) {
        self.tables.volumes.push(volume);
    }

    fn networks_in(&self, cluster: Uuid) -> Vec<Network> {
        self.tables
            .networks
            .iter()
            .filter(|n| n.cluster == cluster)
            .cloned()
            .collect()
    }

    fn subnets_in(&self, cluster: Uuid) -> Vec<Subnet> {
        self.tables
            .subnets
            .iter()
            .filter(|s| s.cluster == cluster)
            .cloned()
            .collect()
    }

    fn instances_in(&self, cluster: Uuid) -> Vec<Instance> {
        let subnet_ids: Vec<Uuid> = self
            .subnets_in(cluster)
            .into_iter()
            .map(|s| s.id)
            .collect();
        self.tables
            .instances
            .iter()
            .filter(|i| subnet_ids.contains(&i.subnet))
            .cloned()
            .collect()
    }

    fn subnet_by_id(&self, id: Uuid) -> Option<Subnet> {
        self.tables.subnets.iter().find(|s| s.id == id).cloned()
    }

    fn instance_by_id(&self, id: Uuid) -> Option<Instance> {
        self.tables.instances.iter().find(|i| i.id == id).cloned()
    }

    fn role_by_id(&self, id: Uuid) -> Option<Role> {
        self.tables.roles.iter().find(|r| r.id == id).cloned()
    }

    fn roles_of(&self, instance: Uuid) -> Vec<Role> {
        self.tables
            .roles
            .iter()
            .filter(|r| r.instance == instance)
            .cloned()
            .collect()
    }

    fn client_links_of(&self, role: Uuid) -> Vec<RoleLink> {
        self.tables
            .role_links
            .iter()
            .filter(|l| l.client_role == role)
            .cloned()
            .collect()
    }

    fn volumes_of(&self, instance: Uuid) -> Vec<Volume> {
        self.tables
            .volumes
            .iter()
            .filter(|v| v.instance == instance)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(name: &str) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let mut store = MemoryStore::new();
        store.add_tenant(tenant("acme"));

        store.begin();
        store.add_tenant(tenant("globex"));
        assert!(store.tenant_by_name("globex").is_some());
        store.rollback();

        assert!(store.tenant_by_name("globex").is_none());
        assert!(store.tenant_by_name("acme").is_some());
    }

    #[test]
    fn test_commit_discards_snapshot() {
        let mut store = MemoryStore::new();
        store.begin();
        store.add_tenant(tenant("acme"));
        store.commit();

        // A rollback after commit must not undo committed work.
        store.rollback();
        assert!(store.tenant_by_name("acme").is_some());
    }
}
