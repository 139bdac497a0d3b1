//! Role tag expansion.
//!
//! The `role` tag declares which functions an instance performs, either as a
//! CSV string or a list. Most names map to exactly one role; the datanode
//! and datanode-replica families expand into one role per declared index
//! and are registered in per-cluster index registries consumed by the
//! implicit topology pass.

use std::collections::BTreeMap;

use lattice_api::{
    constants::{
        COORDINATOR_FAMILY, DATANODE_FAMILY, DATANODE_REPLICA_FAMILY, DN_LIST_TAG,
        DN_REPLICA_LIST_TAG, GTM_FAMILY, ROLE_TAG,
    },
    document::TagValue,
    error::ConfigError,
    model::{Instance, Role},
};

use super::parser::ParseSession;

/// Expands the instance's `role` tag into role entities, returning the
/// declared role names in order. Blank names are skipped.
pub(crate) fn expand(
    session: &mut ParseSession,
    instance: &Instance,
    tags: &BTreeMap<String, TagValue>,
) -> Result<Vec<String>, ConfigError> {
    let declared = tags.get(ROLE_TAG).map(TagValue::as_list).unwrap_or_default();

    for role_name in &declared {
        match role_name.as_str() {
            DATANODE_FAMILY => {
                expand_indexed(session, instance, tags, DATANODE_FAMILY, DN_LIST_TAG)?
            }
            DATANODE_REPLICA_FAMILY => expand_indexed(
                session,
                instance,
                tags,
                DATANODE_REPLICA_FAMILY,
                DN_REPLICA_LIST_TAG,
            )?,
            _ => {
                let role = Role::new(instance.id, role_name, role_name);
                session.store.add_role(role.clone());
                session
                    .roles
                    .insert((instance.name.clone(), role_name.clone()), role.clone());

                match role_name.as_str() {
                    GTM_FAMILY => session.gtm_roles.push(role),
                    COORDINATOR_FAMILY => session.coord_roles.push(role),
                    _ => {}
                }
            }
        }
    }

    Ok(declared)
}

/// Creates one `<family>-<index>` role per index in the family's list tag.
/// Indices key the family's registry across the whole cluster, so a
/// redeclared index is fatal.
fn expand_indexed(
    session: &mut ParseSession,
    instance: &Instance,
    tags: &BTreeMap<String, TagValue>,
    family: &'static str,
    tag: &'static str,
) -> Result<(), ConfigError> {
    let indices = tags.get(tag).map(TagValue::as_list).unwrap_or_default();
    if indices.is_empty() {
        return Err(ConfigError::EmptyIndexList {
            instance: instance.name.clone(),
            family: family.into(),
            tag: tag.into(),
        });
    }

    for index in indices {
        let name = format!("{family}-{index}");
        let role = Role::new(instance.id, &name, family);
        session.store.add_role(role.clone());
        session
            .roles
            .insert((instance.name.clone(), name), role.clone());

        let registry = if family == DATANODE_FAMILY {
            &mut session.dn_roles
        } else {
            &mut session.dnr_roles
        };
        if registry.insert(index.clone(), role).is_some() {
            return Err(ConfigError::IndexConflict {
                family: family.into(),
                index,
                instance: instance.name.clone(),
            });
        }
    }

    Ok(())
}
