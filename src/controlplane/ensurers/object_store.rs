//! ObjectStore ensurer
//!
//! Internally the store gets its own pools and gateway daemons. In external
//! mode it only points at the gateway named by the external payload, and is
//! skipped entirely when the payload names none.

use super::{converge, report_phase, Convergent, Outcome};
use crate::controlplane::config::ReconcilerConfig;
use crate::controlplane::external::{Endpoint, ExternalPlan};
use crate::controlplane::pass::Pass;
use crate::crd::{
    GatewaySpec, HealthCheckSpec, ObjectStore, ObjectStoreSpec, PoolSpec, StorageCluster,
};
use crate::domain::conditions::Conditions;
use crate::domain::ports::ResourceStore;
use crate::error::Result;
use tracing::debug;

const GATEWAY_PORT: u16 = 80;
const GATEWAY_INSTANCES: u32 = 2;
const OBJECT_POOL_REPLICAS: u32 = 3;
const DATA_POOL_TARGET_RATIO: f64 = 0.49;
const EXTERNAL_HEALTH_CHECK_INTERVAL: &str = "60s";

pub async fn ensure<S: ResourceStore>(pass: &mut Pass<'_, S>) -> Result<Outcome> {
    let policy = &pass.cluster.spec.managed_resources.object_stores;
    if policy.ignored() {
        return Ok(Outcome::Skipped);
    }
    let strategy = policy.reconcile_strategy;

    let desired = if pass.is_external() {
        let Some(gateway) = pass.external.as_ref().and_then(|p| p.gateway.clone()) else {
            debug!("External payload names no object gateway");
            return Ok(Outcome::Skipped);
        };
        external(&pass.cluster, &gateway)
    } else {
        if pass.config.platform.avoids_object_store() {
            debug!(platform = %pass.config.platform, "Platform provides object storage, skipping");
            return Ok(Outcome::Skipped);
        }
        internal(&pass.cluster, pass.config, pass.failure_domain())
    };

    converge(pass, desired, strategy).await
}

/// Desired store for the current mode, or `None` when no store applies
pub fn desired(
    cluster: &StorageCluster,
    config: &ReconcilerConfig,
    plan: Option<&ExternalPlan>,
) -> Option<ObjectStore> {
    if cluster.is_external() {
        plan.and_then(|p| p.gateway.as_ref())
            .map(|gateway| external(cluster, gateway))
    } else if config.platform.avoids_object_store() {
        None
    } else {
        let failure_domain = cluster.status.as_ref().and_then(|s| s.failure_domain.clone());
        Some(internal(cluster, config, failure_domain))
    }
}

fn internal(
    cluster: &StorageCluster,
    config: &ReconcilerConfig,
    failure_domain: Option<String>,
) -> ObjectStore {
    let mut data_pool = PoolSpec::replicated(failure_domain.clone(), OBJECT_POOL_REPLICAS);
    data_pool.replicated.target_size_ratio = Some(DATA_POOL_TARGET_RATIO);

    let spec = ObjectStoreSpec {
        preserve_pools_on_delete: false,
        data_pool: Some(data_pool),
        metadata_pool: Some(PoolSpec::replicated(failure_domain, OBJECT_POOL_REPLICAS)),
        gateway: GatewaySpec {
            port: GATEWAY_PORT,
            instances: GATEWAY_INSTANCES,
            external_endpoints: Vec::new(),
            placement: Some(config.placement.for_component(&cluster.spec.placement, "rgw")),
            resources: cluster.spec.resources.get("rgw").cloned(),
        },
        health_check: None,
    };
    named(cluster, spec)
}

fn external(cluster: &StorageCluster, gateway: &Endpoint) -> ObjectStore {
    let spec = ObjectStoreSpec {
        gateway: GatewaySpec {
            port: gateway.port,
            external_endpoints: vec![gateway.host.clone()],
            ..Default::default()
        },
        health_check: Some(HealthCheckSpec {
            bucket_disabled: false,
            interval: EXTERNAL_HEALTH_CHECK_INTERVAL.to_string(),
        }),
        ..Default::default()
    };
    named(cluster, spec)
}

fn named(cluster: &StorageCluster, spec: ObjectStoreSpec) -> ObjectStore {
    let mut store = ObjectStore::new(&cluster.object_store_name(), spec);
    store.metadata.namespace = Some(cluster.namespace_or_default());
    store
}

impl Convergent for ObjectStore {
    type Spec = ObjectStoreSpec;

    fn spec(&self) -> &ObjectStoreSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut ObjectStoreSpec {
        &mut self.spec
    }

    fn report(&self, conditions: &mut Conditions) {
        report_phase("ObjectStore", self.status.as_ref(), conditions);
    }
}
