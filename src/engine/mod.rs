//! Bidirectional translation between topology documents and the entity
//! graph: the parser walks a document and creates entities through the
//! store gateway inside one transaction; the generator reads a cluster's
//! graph back into a document.

mod generator;
mod links;
mod parser;
mod roles;
mod synth;

use log::info;
use uuid::Uuid;

use lattice_api::{
    document::ClusterDocument,
    error::{ConfigError, EntityKind},
    model::{Cluster, Credential, Provider, Tenant},
};

use crate::store::EntityStore;

use parser::ParseSession;

/// Key under which roles are resolved: (owning instance name, role name).
pub(crate) type RoleKey = (String, String);

/// Deserializes a topology document from YAML text.
pub fn load_document(text: &str) -> Result<ClusterDocument, ConfigError> {
    serde_yaml::from_str(text).map_err(|err| ConfigError::ParseDocument {
        reason: err.to_string(),
    })
}

/// Builds the entity graph described by `doc`, owned by the named tenant on
/// the named provider. The whole effect is transactional: on any error the
/// store is left exactly as it was.
pub fn build_cluster_from_document(
    store: &mut dyn EntityStore,
    tenant_id: Uuid,
    provider_name: &str,
    doc: &ClusterDocument,
) -> Result<Cluster, ConfigError> {
    let tenant = store
        .tenant_by_id(tenant_id)
        .ok_or_else(|| ConfigError::ReferenceNotFound {
            kind: EntityKind::Tenant,
            name: tenant_id.to_string(),
        })?;
    let provider =
        store
            .provider_by_name(provider_name)
            .ok_or_else(|| ConfigError::ReferenceNotFound {
                kind: EntityKind::Provider,
                name: provider_name.to_string(),
            })?;

    store.begin();
    match build(store, tenant, provider, doc) {
        Ok(cluster) => {
            store.commit();
            Ok(cluster)
        }
        Err(err) => {
            store.rollback();
            Err(err)
        }
    }
}

fn build(
    store: &mut dyn EntityStore,
    tenant: Tenant,
    provider: Provider,
    doc: &ClusterDocument,
) -> Result<Cluster, ConfigError> {
    // Documents carry no credential reference. A stub pair keeps the graph
    // well-formed until real credentials are attached out of band.
    let credential = match store.credential_for(tenant.id, provider.id) {
        Some(credential) => credential,
        None => {
            info!("No credential for tenant '{}', creating a stub", tenant.name);
            let credential = Credential {
                id: Uuid::new_v4(),
                tenant: tenant.id,
                provider: provider.id,
                name: format!("Stub Credentials for {}", provider.name),
                shared_identity: "AK".into(),
                shared_secret: "SAK".into(),
            };
            store.add_credential(credential.clone());
            credential
        }
    };

    ParseSession::new(store, tenant, provider, credential).build(doc)
}

/// Regenerates a topology document for `cluster` as YAML text. Read-only;
/// the output re-parses to an equivalent graph but is not guaranteed to be
/// byte-identical to the document the graph was built from.
pub fn render_document(store: &dyn EntityStore, cluster: &Cluster) -> Result<String, ConfigError> {
    let doc = generator::generate(store, cluster)?;
    serde_yaml::to_string(&doc).map_err(|err| ConfigError::RenderDocument {
        reason: err.to_string(),
    })
}
