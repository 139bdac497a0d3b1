// Topology document constants

/// Provider assumed when the caller does not name one.
pub const DEFAULT_PROVIDER_NAME: &str = "EC2";

/// Tag naming an instance's operating system.
pub const OS_TAG: &str = "os";

/// Value of the fixed `os` tag emitted on every rendered instance.
pub const DEFAULT_OS_TAG: &str = "Debian";

/// Tag holding an instance's display name.
pub const NAME_TAG: &str = "Name";

/// Tag declaring the roles an instance performs.
pub const ROLE_TAG: &str = "role";

/// Tag listing the indices of an instance's datanode roles.
pub const DN_LIST_TAG: &str = "dn_list";

/// Tag listing the indices of an instance's datanode-replica roles.
pub const DN_REPLICA_LIST_TAG: &str = "dn_replica_list";

/// Role family expanded into one role per `dn_list` index.
pub const DATANODE_FAMILY: &str = "datanode";

/// Role family expanded into one role per `dn_replica_list` index.
pub const DATANODE_REPLICA_FAMILY: &str = "datanode-replica";

/// Role collected for implicit `gtm` fan-out links.
pub const GTM_FAMILY: &str = "gtm";

/// Role collected for implicit `coordinator` fan-out links.
pub const COORDINATOR_FAMILY: &str = "coordinator";

/// Volume type assigned to entries carrying an `ephemeral` marker.
pub const EPHEMERAL_VOLUME_TYPE: &str = "ephemeral";

/// Default volume size when a volume entry declares none.
pub const DEFAULT_VOLUME_SIZE: &str = "0";

/// Instance name used when the `Name` tag is absent: `node-<node id>`.
pub const DEFAULT_NODE_NAME_PREFIX: &str = "node-";
