//! Reference-data catalog.
//!
//! Topology documents resolve against pre-existing reference data: tenants,
//! providers, regions with their zones and instance types, and volume
//! types. A deployment keeps these in its real store; the CLI loads them
//! from a YAML catalog file and seeds a [`MemoryStore`] with them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lattice_api::model::{Credential, InstanceType, Provider, Region, Tenant, VolumeType, Zone};

use crate::store::{EntityStore, MemoryStore};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    pub tenants: Vec<String>,
    pub providers: Vec<ProviderDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProviderDef {
    pub name: String,
    #[serde(default)]
    pub regions: BTreeMap<String, RegionDef>,
    #[serde(default)]
    pub volume_types: Vec<String>,
    /// Tenants holding credentials for this provider. Tenants not listed
    /// here get a stub credential created for them on first build.
    #[serde(default)]
    pub credentialed_tenants: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RegionDef {
    /// Zone name to instance types available in that zone.
    pub zones: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Creates all catalog entities in `store`.
    pub fn seed(&self, store: &mut MemoryStore) {
        let mut tenants = Vec::new();
        for name in &self.tenants {
            let tenant = Tenant {
                id: Uuid::new_v4(),
                name: name.clone(),
            };
            store.add_tenant(tenant.clone());
            tenants.push(tenant);
        }

        for provider_def in &self.providers {
            let provider = Provider {
                id: Uuid::new_v4(),
                name: provider_def.name.clone(),
            };

            for (region_name, region_def) in &provider_def.regions {
                let region = Region {
                    id: Uuid::new_v4(),
                    provider: provider.id,
                    name: region_name.clone(),
                };
                for (zone_name, instance_types) in &region_def.zones {
                    let zone = Zone {
                        id: Uuid::new_v4(),
                        region: region.id,
                        name: zone_name.clone(),
                    };
                    for type_name in instance_types {
                        store.add_instance_type(InstanceType {
                            id: Uuid::new_v4(),
                            zone: zone.id,
                            name: type_name.clone(),
                        });
                    }
                    store.add_zone(zone);
                }
                store.add_region(region);
            }

            for type_name in &provider_def.volume_types {
                store.add_volume_type(VolumeType {
                    id: Uuid::new_v4(),
                    provider: provider.id,
                    name: type_name.clone(),
                });
            }

            for tenant_name in &provider_def.credentialed_tenants {
                if let Some(tenant) = tenants.iter().find(|t| &t.name == tenant_name) {
                    store.add_credential(Credential {
                        id: Uuid::new_v4(),
                        tenant: tenant.id,
                        provider: provider.id,
                        name: format!("{} credentials for {}", tenant.name, provider.name),
                        shared_identity: "AK".into(),
                        shared_secret: "SAK".into(),
                    });
                }
            }

            store.add_provider(provider);
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    const CATALOG: &str = indoc! {r#"
        tenants:
          - acme
        providers:
          - name: EC2
            regions:
              eu-west-1:
                zones:
                  eu-west-1a: [t3.micro, t3.large]
                  eu-west-1b: [t3.micro]
            volume_types: [gp2, ephemeral]
            credentialed_tenants: [acme]
    "#};

    #[test]
    fn test_seed_from_yaml() {
        let catalog = Catalog::from_yaml(CATALOG).unwrap();
        let mut store = MemoryStore::new();
        catalog.seed(&mut store);

        let tenant = store.tenant_by_name("acme").unwrap();
        let provider = store.provider_by_name("EC2").unwrap();
        let region = store.region(provider.id, "eu-west-1").unwrap();
        let zone = store.zone(region.id, "eu-west-1a").unwrap();

        assert!(store.instance_type(zone.id, "t3.large").is_some());
        let other_zone = store.zone(region.id, "eu-west-1b").unwrap();
        assert!(store.instance_type(other_zone.id, "t3.large").is_none());

        assert!(store.volume_type(provider.id, "ephemeral").is_some());
        assert!(store.credential_for(tenant.id, provider.id).is_some());
    }
}
