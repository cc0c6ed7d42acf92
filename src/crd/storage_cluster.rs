//! StorageCluster CRD
//!
//! The top-level desired/observed state object. Created once by an installer;
//! its status is written only by the reconciliation engine, and every child
//! resource it spawns is owned by it.

use kube::CustomResource;
use kube::ResourceExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::common::{ComponentResources, Placement, VolumeTemplate};
use crate::domain::conditions::{Conditions, Phase};
use crate::error::Error;

/// Finalizer guarding storage class teardown
pub const STORAGE_CLUSTER_FINALIZER: &str = "storagecluster.storage.billyronks.io";

// =============================================================================
// StorageCluster CRD
// =============================================================================

/// StorageCluster declares a storage cluster: its device sets, placement and
/// how each auxiliary resource kind is reconciled.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "storage.billyronks.io",
    version = "v1",
    kind = "StorageCluster",
    plural = "storageclusters",
    shortname = "stc",
    status = "StorageClusterStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "External", "type": "boolean", "jsonPath": ".spec.externalStorage.enable"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterSpec {
    /// Device sets backing the engine's data daemons
    #[serde(default)]
    pub storage_device_sets: Vec<StorageDeviceSet>,

    /// Per-component placement overrides ("all", "mon", "rgw", "mds", ...)
    #[serde(default)]
    pub placement: BTreeMap<String, Placement>,

    /// Per-component resource overrides
    #[serde(default)]
    pub resources: BTreeMap<String, ComponentResources>,

    /// How auxiliary resources are reconciled
    #[serde(default)]
    pub managed_resources: ManagedResources,

    /// Connect to a pre-existing cluster instead of provisioning one
    #[serde(default)]
    pub external_storage: ExternalStorageSpec,

    /// Run engine daemons on the host network
    #[serde(default)]
    pub host_network: bool,

    /// Spread devices evenly across hosts regardless of zones/racks
    #[serde(default)]
    pub flexible_scaling: bool,

    /// Explicit volume template for monitor data
    #[serde(default)]
    pub mon_pvc_template: Option<VolumeTemplate>,

    /// Host path for monitor data when no volume template applies
    #[serde(default)]
    pub mon_data_dir_host_path: Option<String>,

    /// Version of the StorageCluster
    #[serde(default)]
    pub version: Option<String>,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// A set of storage devices; expanded into one engine device set per replica
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageDeviceSet {
    pub name: String,

    /// Number of devices in each replica
    pub count: u32,

    /// Number of engine device sets for this set (defaults to 3)
    #[serde(default)]
    pub replica: Option<u32>,

    /// SSD, HDD or NVMe
    #[serde(default)]
    pub device_type: Option<String>,

    /// Whether devices may move between nodes
    #[serde(default)]
    pub portable: bool,

    /// Placement override; the default device placement applies when unset
    #[serde(default)]
    pub placement: Option<Placement>,

    #[serde(default)]
    pub resources: Option<ComponentResources>,

    #[serde(default)]
    pub config: DeviceSetConfig,

    pub data_pvc_template: VolumeTemplate,
}

/// Engine data-daemon tuning for a device set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSetConfig {
    #[serde(default)]
    pub tune_slow_device_class: bool,
}

/// Reconcile policies per managed resource kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResources {
    #[serde(default)]
    pub block_pools: ReconcilePolicy,
    #[serde(default)]
    pub filesystems: ReconcilePolicy,
    #[serde(default)]
    pub object_stores: ReconcilePolicy,
}

/// Whether and how the engine manages a resource kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePolicy {
    #[serde(default)]
    pub reconcile_strategy: ReconcileStrategy,
    #[serde(default)]
    pub disable_storage_class: bool,
    #[serde(default)]
    pub disable_snapshot_class: bool,
}

impl ReconcilePolicy {
    pub fn ignored(&self) -> bool {
        self.reconcile_strategy == ReconcileStrategy::Ignore
    }

}

/// Reconcile strategy: Manage converges fully, Init creates once, Ignore never touches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStrategy {
    #[default]
    #[serde(alias = "")]
    Manage,
    Init,
    #[serde(alias = "standalone")]
    Ignore,
}

impl std::fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileStrategy::Manage => write!(f, "manage"),
            ReconcileStrategy::Init => write!(f, "init"),
            ReconcileStrategy::Ignore => write!(f, "ignore"),
        }
    }
}

/// External cluster connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalStorageSpec {
    #[serde(default)]
    pub enable: bool,
}

// =============================================================================
// Status
// =============================================================================

/// Observed state of the StorageCluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterStatus {
    /// Current phase
    #[serde(default)]
    pub phase: Option<Phase>,

    /// Conditions, at most one per type
    #[serde(default)]
    pub conditions: Conditions,

    /// Child objects created and found in the cluster
    #[serde(default)]
    pub related_objects: Vec<RelatedObject>,

    /// Topology label values across storage nodes
    #[serde(default)]
    pub node_topologies: Option<NodeTopologyMap>,

    /// Base topology level data replicas are spread across
    #[serde(default)]
    pub failure_domain: Option<String>,

    /// Digest of the last processed external cluster payload
    #[serde(default)]
    pub external_secret_hash: Option<String>,
}

/// Reference to a child object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelatedObject {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
}

/// Values of each topology label across storage nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeTopologyMap {
    #[serde(default)]
    pub labels: BTreeMap<String, Vec<String>>,
}

impl NodeTopologyMap {
    /// Add a value under a label key, keeping values sorted and unique
    pub fn add(&mut self, key: &str, value: &str) {
        let values = self.labels.entry(key.to_string()).or_default();
        if let Err(pos) = values.binary_search_by(|v| v.as_str().cmp(value)) {
            values.insert(pos, value.to_string());
        }
    }

    pub fn values(&self, key: &str) -> &[String] {
        self.labels.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

// =============================================================================
// StorageClusterInitialization CRD
// =============================================================================

/// One-time initialization marker owned by a StorageCluster
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "storage.billyronks.io",
    version = "v1",
    kind = "StorageClusterInitialization",
    plural = "storageclusterinitializations",
    status = "StorageClusterInitializationStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterInitializationSpec {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterInitializationStatus {
    #[serde(default)]
    pub phase: Option<String>,
}

// =============================================================================
// Implementations
// =============================================================================

impl StorageCluster {
    /// Namespace of the cluster; children are created alongside it
    pub fn namespace_or_default(&self) -> String {
        self.namespace().unwrap_or_else(|| "default".to_string())
    }

    pub fn is_external(&self) -> bool {
        self.spec.external_storage.enable
    }

    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Reject specs no pass can converge until they are edited.
    ///
    /// Device set names seed the `<set>-<i>` engine device sets, so they must
    /// be non-empty and unique.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.is_external() {
            return Ok(());
        }
        let mut seen = BTreeSet::new();
        for set in &self.spec.storage_device_sets {
            if set.name.trim().is_empty() {
                return Err(Error::Configuration(
                    "storage device set with an empty name".to_string(),
                ));
            }
            if !seen.insert(set.name.as_str()) {
                return Err(Error::Configuration(format!(
                    "storage device set {:?} is defined more than once",
                    set.name
                )));
            }
        }
        Ok(())
    }

    pub fn engine_cluster_name(&self) -> String {
        self.name_any()
    }

    pub fn block_pool_name(&self) -> String {
        format!("{}-blockpool", self.name_any())
    }

    pub fn filesystem_name(&self) -> String {
        format!("{}-filesystem", self.name_any())
    }

    pub fn object_store_name(&self) -> String {
        format!("{}-objectstore", self.name_any())
    }

    pub fn filesystem_storage_class_name(&self) -> String {
        format!("{}-fs", self.name_any())
    }

    /// Block storage class name; thick-provisioned variant gets a suffix
    pub fn block_storage_class_name(&self, thick: bool) -> String {
        if thick {
            format!("{}-block-thick", self.name_any())
        } else {
            format!("{}-block", self.name_any())
        }
    }

    pub fn object_storage_class_name(&self) -> String {
        format!("{}-object", self.name_any())
    }

    /// Mutable status, initialized on first access
    pub fn status_mut(&mut self) -> &mut StorageClusterStatus {
        self.status.get_or_insert_with(StorageClusterStatus::default)
    }

    pub fn conditions(&self) -> Option<&Conditions> {
        self.status.as_ref().map(|s| &s.conditions)
    }

    pub fn phase(&self) -> Option<Phase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}

impl StorageClusterStatus {
    /// Insert or replace a related object reference, keyed by kind/namespace/name
    pub fn set_related_object(&mut self, reference: RelatedObject) {
        if let Some(existing) = self.related_objects.iter_mut().find(|r| {
            r.kind == reference.kind
                && r.name == reference.name
                && r.namespace == reference.namespace
        }) {
            *existing = reference;
        } else {
            self.related_objects.push(reference);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(name: &str) -> StorageCluster {
        let mut sc = StorageCluster::new(name, StorageClusterSpec::default());
        sc.metadata.namespace = Some("storage".into());
        sc
    }

    #[test]
    fn test_child_names() {
        let sc = cluster("ocs");
        assert_eq!(sc.block_pool_name(), "ocs-blockpool");
        assert_eq!(sc.filesystem_name(), "ocs-filesystem");
        assert_eq!(sc.object_store_name(), "ocs-objectstore");
        assert_eq!(sc.block_storage_class_name(true), "ocs-block-thick");
        assert_eq!(sc.block_storage_class_name(false), "ocs-block");
    }

    #[test]
    fn test_validate_device_set_names() {
        let set = |name: &str| StorageDeviceSet {
            name: name.into(),
            count: 1,
            ..Default::default()
        };
        let mut sc = cluster("ocs");
        sc.spec.storage_device_sets = vec![set("ssd"), set("hdd")];
        assert!(sc.validate().is_ok());

        sc.spec.storage_device_sets.push(set("ssd"));
        let err = sc.validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("ssd"));

        sc.spec.storage_device_sets = vec![set(" ")];
        assert!(sc.validate().is_err());

        // External clusters carry no device sets of their own
        sc.spec.external_storage.enable = true;
        assert!(sc.validate().is_ok());
    }

    #[test]
    fn test_strategy_parsing() {
        let p: ReconcilePolicy = serde_json::from_str(r#"{"reconcileStrategy":""}"#).unwrap();
        assert_eq!(p.reconcile_strategy, ReconcileStrategy::Manage);

        let p: ReconcilePolicy =
            serde_json::from_str(r#"{"reconcileStrategy":"init","disableStorageClass":true}"#)
                .unwrap();
        assert_eq!(p.reconcile_strategy, ReconcileStrategy::Init);
        assert!(p.disable_storage_class);

        let p: ReconcilePolicy = serde_json::from_str(r#"{"reconcileStrategy":"ignore"}"#).unwrap();
        assert!(p.ignored());
    }

    #[test]
    fn test_related_objects_replace_by_key() {
        let mut status = StorageClusterStatus::default();
        let mut r = RelatedObject {
            api_version: "engine.billyronks.io/v1".into(),
            kind: "EngineCluster".into(),
            name: "ocs".into(),
            namespace: Some("storage".into()),
            uid: Some("a".into()),
        };
        status.set_related_object(r.clone());
        r.uid = Some("b".into());
        status.set_related_object(r);

        assert_eq!(status.related_objects.len(), 1);
        assert_eq!(status.related_objects[0].uid.as_deref(), Some("b"));
    }

    #[test]
    fn test_topology_map_dedup() {
        let mut map = NodeTopologyMap::default();
        map.add("zone", "b");
        map.add("zone", "a");
        map.add("zone", "b");
        assert_eq!(map.values("zone"), ["a".to_string(), "b".to_string()]);
        assert!(map.values("rack").is_empty());
    }
}
