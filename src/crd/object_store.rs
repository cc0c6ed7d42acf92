//! ObjectStore CRD
//!
//! An S3-compatible object gateway. Internally provisioned stores own their
//! data/metadata pools; in external mode the store only points at existing
//! gateway endpoints.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ComponentResources, PhaseStatus, Placement, PoolSpec, ResourcePhase};

/// Object gateway and its backing pools
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "engine.billyronks.io",
    version = "v1",
    kind = "ObjectStore",
    plural = "objectstores",
    status = "PhaseStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStoreSpec {
    #[serde(default)]
    pub preserve_pools_on_delete: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_pool: Option<PoolSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_pool: Option<PoolSpec>,

    pub gateway: GatewaySpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckSpec>,
}

/// Gateway daemons, or external endpoints in external mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    pub port: u16,

    #[serde(default)]
    pub instances: u32,

    /// Addresses of gateways running outside this cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_endpoints: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ComponentResources>,
}

/// Bucket health probing performed by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckSpec {
    pub bucket_disabled: bool,
    pub interval: String,
}

impl ObjectStore {
    pub fn phase(&self) -> Option<ResourcePhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}
