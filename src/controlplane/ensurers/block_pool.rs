//! BlockPool ensurer

use super::{converge, report_phase, Convergent, Outcome};
use crate::controlplane::pass::Pass;
use crate::crd::{BlockPool, BlockPoolSpec, PoolSpec, StorageCluster};
use crate::domain::conditions::Conditions;
use crate::domain::ports::ResourceStore;
use crate::error::Result;

pub const BLOCK_POOL_REPLICAS: u32 = 3;

pub async fn ensure<S: ResourceStore>(pass: &mut Pass<'_, S>) -> Result<Outcome> {
    let policy = &pass.cluster.spec.managed_resources.block_pools;
    if policy.ignored() {
        return Ok(Outcome::Skipped);
    }
    let strategy = policy.reconcile_strategy;
    let desired = desired(&pass.cluster, pass.failure_domain());
    converge(pass, desired, strategy).await
}

pub fn desired(cluster: &StorageCluster, failure_domain: Option<String>) -> BlockPool {
    let mut pool = BlockPool::new(
        &cluster.block_pool_name(),
        BlockPoolSpec {
            pool: PoolSpec::replicated(failure_domain, BLOCK_POOL_REPLICAS),
            enable_stats: false,
        },
    );
    pool.metadata.namespace = Some(cluster.namespace_or_default());
    pool
}

impl Convergent for BlockPool {
    type Spec = BlockPoolSpec;

    fn spec(&self) -> &BlockPoolSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut BlockPoolSpec {
        &mut self.spec
    }

    fn report(&self, conditions: &mut Conditions) {
        report_phase("BlockPool", self.status.as_ref(), conditions);
    }
}
