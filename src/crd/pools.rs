//! BlockPool and Filesystem CRDs
//!
//! Engine-side pools the block and filesystem storage classes provision from.
//! Storage classes are only created once these report `Ready`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{PhaseStatus, Placement, PoolSpec, ResourcePhase};

// =============================================================================
// BlockPool CRD
// =============================================================================

/// Replicated pool serving block volumes
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "engine.billyronks.io",
    version = "v1",
    kind = "BlockPool",
    plural = "blockpools",
    status = "PhaseStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BlockPoolSpec {
    #[serde(flatten)]
    pub pool: PoolSpec,

    /// Collect per-image IO statistics
    #[serde(default)]
    pub enable_stats: bool,
}

// =============================================================================
// Filesystem CRD
// =============================================================================

/// Shared filesystem with its own metadata and data pools
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "engine.billyronks.io",
    version = "v1",
    kind = "Filesystem",
    plural = "filesystems",
    status = "PhaseStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemSpec {
    pub metadata_pool: PoolSpec,
    pub data_pools: Vec<PoolSpec>,
    pub metadata_server: MetadataServerSpec,
}

/// Metadata server daemons of a filesystem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataServerSpec {
    pub active_count: u32,
    pub active_standby: bool,
    #[serde(default)]
    pub placement: Placement,
}

impl BlockPool {
    pub fn phase(&self) -> Option<ResourcePhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}

impl Filesystem {
    pub fn phase(&self) -> Option<ResourcePhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}
