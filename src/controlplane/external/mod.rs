//! External-secret synthesizer
//!
//! In external mode the cluster is described by one secret holding a JSON
//! array of `{kind, name, data}` records. Each pass decodes it and builds an
//! [`ExternalPlan`]. Dispatch (probes and config map / secret creation) only
//! runs when the payload checksum differs from the one recorded in status;
//! the new checksum is staged on the pass and committed by the orchestrator
//! only if the whole pass succeeds.

pub mod dispatch;
pub mod plan;
pub mod records;

pub use plan::{ClassSlot, Endpoint, ExternalPlan};
pub use records::{decode_records, payload_checksum, ExternalRecord, RecordKind};

use crate::controlplane::pass::Pass;
use crate::domain::ports::ResourceStore;
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::Secret;
use tracing::{debug, info};

/// Secret describing the external cluster
pub const EXTERNAL_SECRET_NAME: &str = "storage-external-cluster-details";
/// Key of that secret holding the record array
pub const EXTERNAL_SECRET_KEY: &str = "external_cluster_details";

/// Read the payload, build the plan and dispatch it if it changed
pub async fn ensure<S: ResourceStore>(pass: &mut Pass<'_, S>) -> Result<()> {
    let namespace = pass.namespace();
    let secret: Secret = pass
        .store
        .get(&namespace, EXTERNAL_SECRET_NAME)
        .await?
        .ok_or_else(|| Error::ExternalSecretMissing {
            name: EXTERNAL_SECRET_NAME.to_string(),
        })?;

    let payload = secret
        .data
        .as_ref()
        .and_then(|d| d.get(EXTERNAL_SECRET_KEY))
        .ok_or_else(|| {
            Error::ExternalSecretMalformed(format!("key {} not present", EXTERNAL_SECRET_KEY))
        })?;

    let checksum = payload_checksum(&payload.0);
    let records = decode_records(&payload.0)?;
    let plan = ExternalPlan::build(records, checksum.clone())?;

    let recorded = pass
        .cluster
        .status
        .as_ref()
        .and_then(|s| s.external_secret_hash.as_deref());

    if recorded == Some(checksum.as_str()) {
        debug!("External cluster details unchanged, skipping dispatch");
    } else {
        info!(
            config_maps = plan.config_maps.len(),
            secrets = plan.secrets.len(),
            "External cluster details changed, dispatching records"
        );
        dispatch::dispatch(pass, &plan).await?;
        pass.staged_checksum = Some(checksum);
    }

    pass.external = Some(plan);
    Ok(())
}
