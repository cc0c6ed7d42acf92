//! Filesystem ensurer
//!
//! One replicated metadata pool, one replicated data pool and a single
//! active metadata server with a hot standby.

use super::{converge, report_phase, Convergent, Outcome};
use crate::controlplane::config::ReconcilerConfig;
use crate::controlplane::pass::Pass;
use crate::crd::{Filesystem, FilesystemSpec, MetadataServerSpec, PoolSpec, StorageCluster};
use crate::domain::conditions::Conditions;
use crate::domain::ports::ResourceStore;
use crate::error::Result;

const FILESYSTEM_POOL_REPLICAS: u32 = 3;

pub async fn ensure<S: ResourceStore>(pass: &mut Pass<'_, S>) -> Result<Outcome> {
    let policy = &pass.cluster.spec.managed_resources.filesystems;
    if policy.ignored() {
        return Ok(Outcome::Skipped);
    }
    let strategy = policy.reconcile_strategy;
    let desired = desired(&pass.cluster, pass.config, pass.failure_domain());
    converge(pass, desired, strategy).await
}

pub fn desired(
    cluster: &StorageCluster,
    config: &ReconcilerConfig,
    failure_domain: Option<String>,
) -> Filesystem {
    let pool = PoolSpec::replicated(failure_domain, FILESYSTEM_POOL_REPLICAS);
    let mut fs = Filesystem::new(
        &cluster.filesystem_name(),
        FilesystemSpec {
            metadata_pool: pool.clone(),
            data_pools: vec![pool],
            metadata_server: MetadataServerSpec {
                active_count: 1,
                active_standby: true,
                placement: config.placement.for_component(&cluster.spec.placement, "mds"),
            },
        },
    );
    fs.metadata.namespace = Some(cluster.namespace_or_default());
    fs
}

impl Convergent for Filesystem {
    type Spec = FilesystemSpec;

    fn spec(&self) -> &FilesystemSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut FilesystemSpec {
        &mut self.spec
    }

    fn report(&self, conditions: &mut Conditions) {
        report_phase("Filesystem", self.status.as_ref(), conditions);
    }
}
