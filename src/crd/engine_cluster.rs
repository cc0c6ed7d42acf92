//! EngineCluster CRD
//!
//! The storage engine's cluster object. The engine itself is a black box that
//! consumes this spec and reports a coarse state back through the status.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::common::{ComponentResources, Placement, VolumeTemplate};

// =============================================================================
// EngineCluster CRD
// =============================================================================

/// EngineCluster configures the storage engine's daemons and devices.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "engine.billyronks.io",
    version = "v1",
    kind = "EngineCluster",
    plural = "engineclusters",
    status = "EngineClusterStatus",
    printcolumn = r#"{"name": "State", "type": "string", "jsonPath": ".status.state"}"#,
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct EngineClusterSpec {
    /// Engine container image
    #[serde(default)]
    pub image: String,

    /// Host path for daemon configuration and data
    #[serde(default)]
    pub data_dir_host_path: String,

    #[serde(default)]
    pub mon: MonSpec,

    /// Manager modules to enable
    #[serde(default)]
    pub mgr_modules: Vec<MgrModule>,

    #[serde(default)]
    pub network: NetworkSpec,

    #[serde(default)]
    pub monitoring: MonitoringSpec,

    #[serde(default)]
    pub storage: StorageScope,

    /// Placement per component ("all" applies to every daemon)
    #[serde(default)]
    pub placement: BTreeMap<String, Placement>,

    #[serde(default)]
    pub disruption_management: DisruptionManagement,

    /// Connect to an existing cluster rather than deploying one
    #[serde(default)]
    pub external: ExternalSpec,
}

/// Monitor quorum settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonSpec {
    pub count: u32,
    #[serde(default)]
    pub allow_multiple_per_node: bool,
    #[serde(default)]
    pub volume_template: Option<VolumeTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MgrModule {
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    #[serde(default)]
    pub host_network: bool,
}

/// Metrics and alerting integration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSpec {
    pub enabled: bool,
    #[serde(default)]
    pub rules_namespace: Option<String>,
    /// Manager endpoints of an external cluster
    #[serde(default)]
    pub external_mgr_endpoints: Vec<String>,
    #[serde(default)]
    pub external_mgr_prometheus_port: Option<u16>,
}

/// Devices consumed by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageScope {
    #[serde(default)]
    pub device_sets: Vec<DeviceSet>,
    #[serde(default)]
    pub topology_aware: bool,
}

/// One engine device set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSet {
    pub name: String,
    pub count: u32,
    #[serde(default)]
    pub portable: bool,
    #[serde(default)]
    pub tune_slow_device_class: bool,
    #[serde(default)]
    pub device_class: Option<String>,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default)]
    pub resources: Option<ComponentResources>,
    #[serde(default)]
    pub volume_templates: Vec<VolumeTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisruptionManagement {
    #[serde(default)]
    pub manage_pod_budgets: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSpec {
    #[serde(default)]
    pub enable: bool,
}

// =============================================================================
// Status
// =============================================================================

/// State reported by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineClusterStatus {
    #[serde(default)]
    pub state: Option<ClusterState>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Coarse engine cluster state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ClusterState {
    Creating,
    Created,
    Updating,
    Connecting,
    Connected,
    Error,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ClusterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClusterState::Creating => "Creating",
            ClusterState::Created => "Created",
            ClusterState::Updating => "Updating",
            ClusterState::Connecting => "Connecting",
            ClusterState::Connected => "Connected",
            ClusterState::Error => "Error",
            ClusterState::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

impl EngineCluster {
    /// Reported state, if the engine has written any status yet
    pub fn state(&self) -> Option<ClusterState> {
        self.status.as_ref().and_then(|s| s.state)
    }

    pub fn status_message(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.message.as_deref())
            .unwrap_or_default()
    }
}
