//! One-time initialization marker

use crate::controlplane::pass::Pass;
use crate::crd::{StorageClusterInitialization, StorageClusterInitializationSpec};
use crate::domain::ports::ResourceStore;
use crate::error::{Error, Result};
use kube::ResourceExt;
use tracing::info;

/// Get or create the marker named after the cluster
pub async fn ensure<S: ResourceStore>(pass: &mut Pass<'_, S>) -> Result<()> {
    let namespace = pass.namespace();
    let name = pass.cluster.name_any();
    if pass
        .store
        .get::<StorageClusterInitialization>(&namespace, &name)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let mut marker =
        StorageClusterInitialization::new(&name, StorageClusterInitializationSpec::default());
    marker.metadata.namespace = Some(namespace.clone());
    marker.metadata.owner_references = Some(vec![pass.owner_reference()?]);

    info!(%name, "Creating StorageClusterInitialization");
    match pass.store.create(&namespace, &marker).await {
        Ok(_) | Err(Error::ResourceExists { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}
