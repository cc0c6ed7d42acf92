//! Side effects of a changed external payload
//!
//! Endpoints are probed before anything is written, so an unreachable
//! endpoint leaves no partially applied record set behind. Config maps and
//! secrets are created once and never updated afterwards, preserving any
//! edits an administrator made to them.

use super::plan::{Endpoint, ExternalPlan};
use super::records::ExternalRecord;
use crate::controlplane::pass::Pass;
use crate::domain::ports::{ManagedResource, ResourceStore};
use crate::error::Result;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use tracing::{debug, info};

/// Probe endpoints, then get-or-create config maps and secrets
pub async fn dispatch<S: ResourceStore>(pass: &mut Pass<'_, S>, plan: &ExternalPlan) -> Result<()> {
    let endpoints: Vec<&Endpoint> = plan.monitoring.iter().chain(plan.gateway.iter()).collect();
    for endpoint in endpoints {
        pass.prober
            .probe(&endpoint.host, endpoint.port, pass.config.probe_timeout)
            .await?;
        debug!(%endpoint, "External endpoint reachable");
    }

    for record in &plan.config_maps {
        let config_map = ConfigMap {
            metadata: child_meta(pass, record)?,
            data: Some(record.data.clone()),
            ..Default::default()
        };
        get_or_create(pass, config_map).await?;
    }

    for record in &plan.secrets {
        let secret = Secret {
            metadata: child_meta(pass, record)?,
            data: Some(
                record
                    .data
                    .iter()
                    .map(|(k, v)| (k.clone(), ByteString(v.clone().into_bytes())))
                    .collect(),
            ),
            ..Default::default()
        };
        get_or_create(pass, secret).await?;
    }

    Ok(())
}

fn child_meta<S: ResourceStore>(pass: &Pass<'_, S>, record: &ExternalRecord) -> Result<ObjectMeta> {
    Ok(ObjectMeta {
        name: Some(record.name.clone()),
        namespace: Some(pass.namespace()),
        owner_references: Some(vec![pass.owner_reference()?]),
        ..Default::default()
    })
}

async fn get_or_create<K: ManagedResource, S: ResourceStore>(
    pass: &Pass<'_, S>,
    object: K,
) -> Result<()> {
    let namespace = pass.namespace();
    let name = kube::ResourceExt::name_any(&object);
    if pass.store.get::<K>(&namespace, &name).await?.is_some() {
        debug!(kind = %K::kind_name(), %name, "Exists, leaving untouched");
        return Ok(());
    }
    info!(kind = %K::kind_name(), %name, "Creating object from external cluster details");
    pass.store.create(&namespace, &object).await?;
    Ok(())
}
