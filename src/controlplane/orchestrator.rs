//! Reconcile Orchestrator - The "Brain"
//!
//! Drives one pass for one StorageCluster key:
//! - Fetches the cluster and handles deletion (storage class teardown, finalizer)
//! - Initializes status and the initialization marker
//! - Runs the ensurer pipeline in a fixed order, stopping at the first error
//! - Aggregates child conditions into phase, conditions and readiness
//! - Persists status at most once
//!
//! Retries belong to the caller; a failed pass records the error and returns it.

use crate::controlplane::config::ReconcilerConfig;
use crate::controlplane::ensurers::{
    block_pool, engine_cluster, filesystem, initialization, object_store, storage_class, topology,
};
use crate::controlplane::external;
use crate::controlplane::pass::Pass;
use crate::controlplane::readiness::Readiness;
use crate::crd::{StorageCluster, StorageClusterStatus, STORAGE_CLUSTER_FINALIZER};
use crate::domain::conditions::{
    Condition, ConditionStatus, ConditionType, Phase, MESSAGE_RECONCILE_COMPLETED,
    MESSAGE_RECONCILE_INIT, REASON_RECONCILE_COMPLETED, REASON_RECONCILE_FAILED,
    REASON_RECONCILE_INIT,
};
use crate::domain::ports::{EndpointProberRef, ResourceStore};
use crate::error::Result;
use crate::metrics::ReconcileMetrics;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

// =============================================================================
// Pipeline
// =============================================================================

/// One ensurer of the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Topology,
    ExternalResources,
    EngineCluster,
    BlockPools,
    Filesystems,
    ObjectStores,
    StorageClasses,
}

/// Execution order; later steps rely on the results of earlier ones
pub const PIPELINE: [Step; 7] = [
    Step::Topology,
    Step::ExternalResources,
    Step::EngineCluster,
    Step::BlockPools,
    Step::Filesystems,
    Step::ObjectStores,
    Step::StorageClasses,
];

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::Topology => "topology",
            Step::ExternalResources => "external-resources",
            Step::EngineCluster => "engine-cluster",
            Step::BlockPools => "block-pools",
            Step::Filesystems => "filesystems",
            Step::ObjectStores => "object-stores",
            Step::StorageClasses => "storage-classes",
        }
    }

    /// Whether the step runs for a cluster in the given mode
    pub fn applies(self, external: bool) -> bool {
        match self {
            Step::Topology | Step::BlockPools | Step::Filesystems => !external,
            Step::ExternalResources => external,
            Step::EngineCluster | Step::ObjectStores | Step::StorageClasses => true,
        }
    }

    async fn run<S: ResourceStore>(self, pass: &mut Pass<'_, S>) -> Result<()> {
        match self {
            Step::Topology => topology::ensure(pass).await,
            Step::ExternalResources => external::ensure(pass).await,
            Step::EngineCluster => engine_cluster::ensure(pass).await.map(drop),
            Step::BlockPools => block_pool::ensure(pass).await.map(drop),
            Step::Filesystems => filesystem::ensure(pass).await.map(drop),
            Step::ObjectStores => object_store::ensure(pass).await.map(drop),
            Step::StorageClasses => storage_class::ensure(pass).await,
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Runs reconcile passes against a store
pub struct Reconciler<S: ResourceStore> {
    store: Arc<S>,
    config: ReconcilerConfig,
    prober: EndpointProberRef,
    readiness: Readiness,
    metrics: ReconcileMetrics,
}

impl<S: ResourceStore> Reconciler<S> {
    pub fn new(
        store: Arc<S>,
        config: ReconcilerConfig,
        prober: EndpointProberRef,
        readiness: Readiness,
        metrics: ReconcileMetrics,
    ) -> Self {
        Self {
            store,
            config,
            prober,
            readiness,
            metrics,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn metrics(&self) -> &ReconcileMetrics {
        &self.metrics
    }

    /// Reconcile the StorageCluster `namespace/name`
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<()> {
        let Some(cluster) = self.store.get::<StorageCluster>(namespace, name).await? else {
            debug!(%namespace, %name, "StorageCluster not found, nothing to do");
            return Ok(());
        };

        if cluster.is_deleting() {
            return self.finalize(cluster).await;
        }

        let span = info_span!("reconcile", cluster = %name, namespace = %namespace);
        let started = Instant::now();
        let (result, recreated) = self.run_pass(cluster).instrument(span).await;
        self.metrics
            .observe(result.is_ok(), started.elapsed(), recreated);
        result
    }

    async fn run_pass(&self, mut cluster: StorageCluster) -> (Result<()>, u64) {
        if !cluster.finalizers().iter().any(|f| f == STORAGE_CLUSTER_FINALIZER) {
            cluster
                .finalizers_mut()
                .push(STORAGE_CLUSTER_FINALIZER.to_string());
            cluster = match self.store.replace(&cluster.namespace_or_default(), &cluster).await {
                Ok(updated) => updated,
                Err(e) => return (Err(e), 0),
            };
            info!("Added finalizer");
        }

        if cluster.conditions().map_or(true, |c| c.is_empty()) {
            let status = cluster.status_mut();
            status
                .conditions
                .set_progressing(REASON_RECONCILE_INIT, MESSAGE_RECONCILE_INIT);
            status.phase = Some(Phase::Progressing);
            cluster = match self.store.update_status(&cluster).await {
                Ok(updated) => updated,
                Err(e) => return (Err(e), 0),
            };
        }

        let observed = cluster.status.clone();
        let mut pass = Pass::new(self.store.as_ref(), &self.config, self.prober.as_ref(), cluster);

        let result = self.run_steps(&mut pass).await;
        let recreated = pass.recreated_classes;
        let result = match result {
            Ok(()) => {
                self.complete(&mut pass);
                self.persist(pass, observed).await
            }
            Err(e) => {
                error!(error = %e, "Reconcile failed");
                let message = format!("Error while reconciling: {}", e);
                let status = pass.cluster.status_mut();
                status.conditions.set_error(REASON_RECONCILE_FAILED, &message);
                status.phase = Some(Phase::Error);
                if let Err(persist) = self.persist(pass, observed).await {
                    warn!(error = %persist, "Failed to record reconcile error in status");
                }
                Err(e)
            }
        };
        (result, recreated)
    }

    async fn run_steps(&self, pass: &mut Pass<'_, S>) -> Result<()> {
        pass.cluster.validate()?;
        initialization::ensure(pass).await?;

        let external = pass.is_external();
        for step in PIPELINE.into_iter().filter(|s| s.applies(external)) {
            debug!(step = step.name(), "Running step");
            step.run(pass).await?;
        }
        Ok(())
    }

    /// Fold the pass outcome into status after every step succeeded
    fn complete(&self, pass: &mut Pass<'_, S>) {
        let expanding = pass.expanding;
        let accumulated = std::mem::take(&mut pass.conditions);
        if let Some(checksum) = pass.staged_checksum.take() {
            pass.cluster.status_mut().external_secret_hash = Some(checksum);
        }

        let status = pass.cluster.status_mut();
        let ready_phase = if expanding { Phase::Expanding } else { Phase::Ready };

        if accumulated.is_empty() {
            status
                .conditions
                .set_complete(REASON_RECONCILE_COMPLETED, MESSAGE_RECONCILE_COMPLETED);
            status.phase = Some(ready_phase);
            self.readiness.set();
            return;
        }

        status.conditions.merge(&accumulated);
        status.conditions.set(Condition::new(
            ConditionType::ReconcileComplete,
            ConditionStatus::True,
            REASON_RECONCILE_COMPLETED,
            MESSAGE_RECONCILE_COMPLETED,
        ));
        status.phase = Some(ready_phase);

        if status.conditions.is_false(ConditionType::Upgradeable) {
            self.readiness.unset();
            if status.phase == Some(Phase::Ready) {
                status.phase = Some(Phase::NotReady);
            }
        }
    }

    /// Write status if the pass changed it
    async fn persist(
        &self,
        pass: Pass<'_, S>,
        observed: Option<StorageClusterStatus>,
    ) -> Result<()> {
        if pass.cluster.status == observed {
            debug!("Status unchanged");
            return Ok(());
        }
        self.store.update_status(&pass.cluster).await?;
        Ok(())
    }

    /// Tear down storage classes and release the finalizer
    async fn finalize(&self, mut cluster: StorageCluster) -> Result<()> {
        if !cluster.finalizers().iter().any(|f| f == STORAGE_CLUSTER_FINALIZER) {
            return Ok(());
        }
        let namespace = cluster.namespace_or_default();
        info!(cluster = %cluster.name_any(), %namespace, "StorageCluster is being deleted");

        if cluster.phase() != Some(Phase::Deleting) {
            cluster.status_mut().phase = Some(Phase::Deleting);
            cluster = self.store.update_status(&cluster).await?;
        }

        let deleted = storage_class::teardown(self.store.as_ref(), &cluster, &self.config).await?;
        info!(deleted, "Storage classes removed");

        cluster
            .finalizers_mut()
            .retain(|f| f != STORAGE_CLUSTER_FINALIZER);
        self.store.replace(&namespace, &cluster).await?;
        info!("Removed finalizer");
        Ok(())
    }
}
