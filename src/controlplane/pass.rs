//! Pass-scoped reconcile context
//!
//! One `Pass` lives for exactly one reconcile of one StorageCluster. Steps
//! read the fetched cluster, fold negative conditions into the accumulator,
//! and hand results to later steps (the external plan, the expanding flag).

use crate::controlplane::config::ReconcilerConfig;
use crate::controlplane::external::ExternalPlan;
use crate::crd::{RelatedObject, StorageCluster};
use crate::domain::conditions::Conditions;
use crate::domain::ports::{EndpointProber, ManagedResource, ResourceStore};
use crate::error::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

pub struct Pass<'a, S: ResourceStore> {
    pub store: &'a S,
    pub config: &'a ReconcilerConfig,
    pub prober: &'a dyn EndpointProber,

    /// The cluster being reconciled; status edits are persisted at the end
    pub cluster: StorageCluster,

    /// Negative conditions reported by children during this pass
    pub conditions: Conditions,

    /// A device set grew during this pass
    pub expanding: bool,

    /// Parsed external cluster payload (external mode only)
    pub external: Option<ExternalPlan>,

    /// Payload checksum to commit if the pass succeeds
    pub staged_checksum: Option<String>,

    /// Storage classes deleted and recreated because their parameters drifted
    pub recreated_classes: u64,
}

impl<'a, S: ResourceStore> Pass<'a, S> {
    pub fn new(
        store: &'a S,
        config: &'a ReconcilerConfig,
        prober: &'a dyn EndpointProber,
        cluster: StorageCluster,
    ) -> Self {
        Self {
            store,
            config,
            prober,
            cluster,
            conditions: Conditions::new(),
            expanding: false,
            external: None,
            staged_checksum: None,
            recreated_classes: 0,
        }
    }

    pub fn namespace(&self) -> String {
        self.cluster.namespace_or_default()
    }

    pub fn is_external(&self) -> bool {
        self.cluster.is_external()
    }

    /// Controller reference pointing at the cluster
    pub fn owner_reference(&self) -> Result<OwnerReference> {
        self.cluster.controller_owner_ref(&()).ok_or_else(|| {
            Error::Internal(format!(
                "StorageCluster {} has no uid to own children",
                self.cluster.name_any()
            ))
        })
    }

    /// Failure domain derived by the topology step, if any
    pub fn failure_domain(&self) -> Option<String> {
        self.cluster
            .status
            .as_ref()
            .and_then(|s| s.failure_domain.clone())
    }

    /// Record a child found in the cluster under status.relatedObjects
    pub fn record_related<K: ManagedResource>(&mut self, object: &K) {
        let reference = RelatedObject {
            api_version: K::api_version(&()).to_string(),
            kind: K::kind_name(),
            name: object.name_any(),
            namespace: object.namespace(),
            uid: object.uid(),
        };
        self.cluster.status_mut().set_related_object(reference);
    }
}
