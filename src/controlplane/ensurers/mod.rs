//! Per-kind ensurers
//!
//! Every dependent kind follows the same shape: compute the desired object,
//! fetch the current one, create it when absent, translate its status into
//! conditions when it already matches, and overwrite its spec when it does
//! not. [`converge`] implements that shape once for every [`Convergent`]
//! kind; storage classes have their own lifecycle in [`storage_class`].

pub mod block_pool;
pub mod engine_cluster;
pub mod filesystem;
pub mod initialization;
pub mod object_store;
pub mod storage_class;
pub mod topology;

use crate::controlplane::pass::Pass;
use crate::crd::{PhaseStatus, ReconcileStrategy, ResourcePhase};
use crate::domain::conditions::{Condition, ConditionStatus, ConditionType, Conditions};
use crate::domain::ports::{ManagedResource, ResourceStore};
use crate::error::{Error, Result};
use kube::ResourceExt;
use tracing::{debug, info};

/// A dependent kind whose spec is owned by the StorageCluster
pub trait Convergent: ManagedResource {
    type Spec: Clone + PartialEq + Send + Sync;

    fn spec(&self) -> &Self::Spec;
    fn spec_mut(&mut self) -> &mut Self::Spec;

    /// Translate the reported status into negative conditions
    fn report(&self, conditions: &mut Conditions);

    /// Whether moving to `desired` adds capacity
    fn expands_to(&self, _desired: &Self::Spec) -> bool {
        false
    }
}

/// What [`converge`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Skipped,
    Created,
    Unchanged,
    Updated,
}

/// Create, inspect or overwrite one dependent object
pub async fn converge<K, S>(
    pass: &mut Pass<'_, S>,
    mut desired: K,
    strategy: ReconcileStrategy,
) -> Result<Outcome>
where
    K: Convergent,
    S: ResourceStore,
{
    if strategy == ReconcileStrategy::Ignore {
        return Ok(Outcome::Skipped);
    }

    let namespace = pass.namespace();
    let name = desired.name_any();
    let kind = K::kind_name();

    let mut found = match pass.store.get::<K>(&namespace, &name).await? {
        Some(found) => found,
        None => {
            desired.meta_mut().owner_references = Some(vec![pass.owner_reference()?]);
            info!(%kind, %name, "Creating");
            pass.store.create(&namespace, &desired).await?;
            return Ok(Outcome::Created);
        }
    };

    if strategy == ReconcileStrategy::Init {
        debug!(%kind, %name, "Init strategy, leaving existing object untouched");
        pass.record_related(&found);
        found.report(&mut pass.conditions);
        return Ok(Outcome::Unchanged);
    }

    if found.meta().deletion_timestamp.is_some() {
        return Err(Error::MarkedForDeletion { kind, name });
    }

    if found.spec() == desired.spec() {
        pass.record_related(&found);
        found.report(&mut pass.conditions);
        return Ok(Outcome::Unchanged);
    }

    if found.expands_to(desired.spec()) {
        info!(%kind, %name, "Device set count increased, cluster is expanding");
        pass.expanding = true;
    }
    info!(%kind, %name, "Updating spec");
    *found.spec_mut() = desired.spec().clone();
    pass.store.replace(&namespace, &found).await?;
    Ok(Outcome::Updated)
}

/// Shared status mapping for kinds reporting a [`PhaseStatus`]
pub(crate) fn report_phase(kind: &str, status: Option<&PhaseStatus>, conditions: &mut Conditions) {
    let Some(status) = status.filter(|s| s.phase.is_some()) else {
        conditions.set(Condition::new(
            ConditionType::Progressing,
            ConditionStatus::True,
            format!("{}NotReporting", kind),
            format!("{} resource is not reporting status", kind),
        ));
        return;
    };

    let detail = status.message.as_deref().unwrap_or_default();
    match status.phase {
        Some(ResourcePhase::Failure) => conditions.set(Condition::new(
            ConditionType::Degraded,
            ConditionStatus::True,
            format!("{}Failure", kind),
            format!("{} reported failure: {}", kind, detail),
        )),
        Some(ResourcePhase::Progressing) => conditions.set(Condition::new(
            ConditionType::Progressing,
            ConditionStatus::True,
            format!("{}Progressing", kind),
            format!("{} is progressing: {}", kind, detail),
        )),
        _ => {}
    }
}
