//! Domain Ports - Core trait definitions for the reconciliation engine
//!
//! These traits define the boundaries between the convergence logic and the
//! cluster it converges. Adapters implement them against the Kubernetes API
//! or in memory.

use crate::crd::{
    BlockPool, EngineCluster, Filesystem, ObjectStore, StorageCluster,
    StorageClusterInitialization,
};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Node, Secret};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Managed Resource Kinds
// =============================================================================

/// A resource kind the engine reads or writes through a [`ResourceStore`]
pub trait ManagedResource:
    Resource<DynamicType = ()>
    + Clone
    + std::fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Whether objects of this kind live inside a namespace
    const NAMESPACED: bool;

    /// Kind name used in logs and errors
    fn kind_name() -> String {
        Self::kind(&()).to_string()
    }
}

macro_rules! managed_resource {
    ($namespaced:expr => $($kind:ty),+ $(,)?) => {
        $(impl ManagedResource for $kind {
            const NAMESPACED: bool = $namespaced;
        })+
    };
}

managed_resource!(true =>
    StorageCluster,
    StorageClusterInitialization,
    EngineCluster,
    BlockPool,
    Filesystem,
    ObjectStore,
    ConfigMap,
    Secret,
);
managed_resource!(false => StorageClass, Node);

// =============================================================================
// Resource Store Port
// =============================================================================

/// Blocking create/get/update/delete access to dependent objects.
///
/// Writes follow an optimistic read-compute-write discipline: `replace`
/// fails with a conflict when the object changed since it was read.
/// Cluster-scoped kinds ignore the namespace argument.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch an object; `None` when it does not exist
    async fn get<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// List objects matching a label selector ("key", "key=value", comma separated)
    async fn list<K: ManagedResource>(&self, namespace: &str, label_selector: &str)
        -> Result<Vec<K>>;

    /// Create a new object
    async fn create<K: ManagedResource>(&self, namespace: &str, object: &K) -> Result<K>;

    /// Replace an existing object as a whole
    async fn replace<K: ManagedResource>(&self, namespace: &str, object: &K) -> Result<K>;

    /// Delete an object; absent objects yield `ResourceNotFound`
    async fn delete<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<()>;

    /// Persist the status subresource of a StorageCluster
    async fn update_status(&self, cluster: &StorageCluster) -> Result<StorageCluster>;
}

// =============================================================================
// Endpoint Prober Port
// =============================================================================

/// Reachability check for endpoints of an external cluster
#[async_trait]
pub trait EndpointProber: Send + Sync {
    /// Succeeds when a connection to `host:port` opens within `timeout`
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<()>;
}

pub type EndpointProberRef = Arc<dyn EndpointProber>;

// =============================================================================
// Platform
// =============================================================================

/// Infrastructure platform the cluster runs on
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Aws,
    Azure,
    Gcp,
    #[value(name = "ibmcloud")]
    IbmCloud,
    #[value(name = "openstack")]
    OpenStack,
    #[value(name = "vsphere")]
    VSphere,
    #[value(name = "baremetal")]
    BareMetal,
    None,
}

impl Platform {
    /// Public clouds ship their own object storage; no gateway is deployed there
    pub fn avoids_object_store(&self) -> bool {
        matches!(
            self,
            Platform::Aws | Platform::Azure | Platform::Gcp | Platform::IbmCloud
        )
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Platform::Aws => "aws",
            Platform::Azure => "azure",
            Platform::Gcp => "gcp",
            Platform::IbmCloud => "ibmcloud",
            Platform::OpenStack => "openstack",
            Platform::VSphere => "vsphere",
            Platform::BareMetal => "baremetal",
            Platform::None => "none",
        };
        f.write_str(s)
    }
}
