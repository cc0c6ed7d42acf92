//! Value types shared by the StorageCluster and the storage engine's kinds

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Placement
// =============================================================================

/// Scheduling constraints for a storage component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Required node label expressions (all must match)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_affinity: Vec<LabelRequirement>,

    /// Taints the component tolerates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    /// Preferred spreading away from matching pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pod_anti_affinity: Vec<WeightedAffinityTerm>,
}

/// A label selector expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabelRequirement {
    pub key: String,
    /// In, NotIn, Exists, DoesNotExist
    pub operator: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl LabelRequirement {
    pub fn exists(key: &str) -> Self {
        Self {
            key: key.to_string(),
            operator: "Exists".to_string(),
            values: Vec::new(),
        }
    }

    pub fn is_in(key: &str, values: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            operator: "In".to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Toleration of a node taint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Toleration {
    pub key: String,
    /// Equal or Exists
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
}

/// Weighted pod anti-affinity term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeightedAffinityTerm {
    pub weight: i32,
    pub label_selector: Vec<LabelRequirement>,
    pub topology_key: String,
}

// =============================================================================
// Volumes & Resources
// =============================================================================

/// Template for the volumes claimed by a storage component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeTemplate {
    /// Storage class the claim is provisioned from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    /// Requested size (e.g., "10Gi")
    #[serde(default)]
    pub storage: String,

    /// Block or Filesystem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_mode: Option<String>,
}

/// Compute resources for a component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentResources {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

// =============================================================================
// Pools
// =============================================================================

/// Replication settings of a pool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplicatedSpec {
    pub size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size_ratio: Option<f64>,
}

/// Pool layout used by block pools, filesystems and object stores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PoolSpec {
    /// Topology level replicas are spread across (host, rack, zone)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_domain: Option<String>,
    pub replicated: ReplicatedSpec,
}

impl PoolSpec {
    pub fn replicated(failure_domain: Option<String>, size: u32) -> Self {
        Self {
            failure_domain,
            replicated: ReplicatedSpec {
                size,
                target_size_ratio: None,
            },
        }
    }
}

// =============================================================================
// Phase reported by engine resources
// =============================================================================

/// Phase reported by pools, filesystems and object stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ResourcePhase {
    Progressing,
    Ready,
    Connected,
    Failure,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourcePhase::Progressing => write!(f, "Progressing"),
            ResourcePhase::Ready => write!(f, "Ready"),
            ResourcePhase::Connected => write!(f, "Connected"),
            ResourcePhase::Failure => write!(f, "Failure"),
            ResourcePhase::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Status block shared by pools, filesystems and object stores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStatus {
    #[serde(default)]
    pub phase: Option<ResourcePhase>,
    #[serde(default)]
    pub message: Option<String>,
}
