//! StorageClass manager
//!
//! Storage classes are cluster-scoped and immutable once created, so they
//! do not go through [`converge`](super::converge): parameter drift is
//! resolved by deleting the class and creating it again. A crash between
//! the two leaves the class absent until the next pass recreates it.
//!
//! In internal mode no class is touched until the block pool and filesystem
//! it provisions from report `Ready`.

use crate::controlplane::config::ReconcilerConfig;
use crate::controlplane::external::{ClassSlot, ExternalPlan};
use crate::controlplane::pass::Pass;
use crate::crd::{BlockPool, Filesystem, ReconcileStrategy, ResourcePhase, StorageCluster};
use crate::domain::ports::{Platform, ResourceStore};
use crate::error::{Error, Result};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const CSI_DRIVER_DOMAIN: &str = "billyronks.io";
const DESCRIPTION_ANNOTATION: &str = "description";
const OBJECT_REGION: &str = "us-east-1";

/// A storage class together with the policy governing it; rebuilt every pass
#[derive(Debug, Clone)]
pub struct StorageClassConfiguration {
    pub storage_class: StorageClass,
    pub strategy: ReconcileStrategy,
    pub disabled: bool,
    /// Engine resource that must be Ready before the class may exist
    pub requires: Option<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    BlockPool(String),
    Filesystem(String),
}

impl StorageClassConfiguration {
    fn skipped(&self) -> bool {
        self.disabled || self.strategy == ReconcileStrategy::Ignore
    }

    pub fn name(&self) -> String {
        self.storage_class.name_any()
    }
}

// =============================================================================
// Desired classes
// =============================================================================

fn csi_secret_parameters(namespace: &str, driver: &str) -> BTreeMap<String, String> {
    let provisioner = format!("engine-csi-{}-provisioner", driver);
    let node = format!("engine-csi-{}-node", driver);
    [
        ("csi.storage.k8s.io/provisioner-secret-name", provisioner.as_str()),
        ("csi.storage.k8s.io/provisioner-secret-namespace", namespace),
        ("csi.storage.k8s.io/node-stage-secret-name", node.as_str()),
        ("csi.storage.k8s.io/node-stage-secret-namespace", namespace),
        ("csi.storage.k8s.io/controller-expand-secret-name", provisioner.as_str()),
        ("csi.storage.k8s.io/controller-expand-secret-namespace", namespace),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn storage_class(
    name: String,
    provisioner: String,
    description: &str,
    parameters: BTreeMap<String, String>,
    expandable: bool,
) -> StorageClass {
    let mut sc = StorageClass {
        provisioner,
        parameters: Some(parameters),
        reclaim_policy: Some("Delete".to_string()),
        allow_volume_expansion: expandable.then_some(true),
        ..Default::default()
    };
    sc.metadata.name = Some(name);
    sc.metadata.annotations = Some(BTreeMap::from([(
        DESCRIPTION_ANNOTATION.to_string(),
        description.to_string(),
    )]));
    sc
}

pub fn filesystem_class(cluster: &StorageCluster) -> StorageClass {
    let ns = cluster.namespace_or_default();
    let mut parameters = csi_secret_parameters(&ns, "fs");
    parameters.insert("clusterID".into(), ns.clone());
    parameters.insert("fsName".into(), cluster.filesystem_name());
    storage_class(
        cluster.filesystem_storage_class_name(),
        format!("{}.fs.csi.{}", ns, CSI_DRIVER_DOMAIN),
        "Provides RWO and RWX filesystem volumes",
        parameters,
        true,
    )
}

pub fn block_class(cluster: &StorageCluster, thick: bool) -> StorageClass {
    let ns = cluster.namespace_or_default();
    let mut parameters = csi_secret_parameters(&ns, "block");
    parameters.insert("clusterID".into(), ns.clone());
    parameters.insert("pool".into(), cluster.block_pool_name());
    parameters.insert("imageFeatures".into(), "layering".into());
    parameters.insert("imageFormat".into(), "2".into());
    parameters.insert("csi.storage.k8s.io/fstype".into(), "ext4".into());
    parameters.insert("thickProvision".into(), thick.to_string());
    let description = if thick {
        "Provides RWO filesystem volumes and RWO/RWX block volumes, fully allocated"
    } else {
        "Provides RWO filesystem volumes and RWO/RWX block volumes"
    };
    storage_class(
        cluster.block_storage_class_name(thick),
        format!("{}.block.csi.{}", ns, CSI_DRIVER_DOMAIN),
        description,
        parameters,
        true,
    )
}

pub fn object_class(cluster: &StorageCluster) -> StorageClass {
    let ns = cluster.namespace_or_default();
    let parameters = BTreeMap::from([
        ("objectStoreNamespace".to_string(), ns.clone()),
        ("region".to_string(), OBJECT_REGION.to_string()),
        ("objectStoreName".to_string(), cluster.object_store_name()),
    ]);
    storage_class(
        cluster.object_storage_class_name(),
        format!("{}.{}/bucket", ns, CSI_DRIVER_DOMAIN),
        "Provides object buckets",
        parameters,
        false,
    )
}

fn merge_parameters(mut sc: StorageClass, extra: Option<&BTreeMap<String, String>>) -> StorageClass {
    if let Some(extra) = extra {
        sc.parameters
            .get_or_insert_with(BTreeMap::new)
            .extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    sc
}

/// Classes this pass should converge, in creation order
pub fn configurations(
    cluster: &StorageCluster,
    platform: Platform,
    plan: Option<&ExternalPlan>,
) -> Vec<StorageClassConfiguration> {
    let managed = &cluster.spec.managed_resources;
    let fs = &managed.filesystems;
    let block = &managed.block_pools;
    let object = &managed.object_stores;

    if cluster.is_external() {
        let Some(plan) = plan else {
            return Vec::new();
        };
        let mut configs = Vec::new();
        for (slot, parameters) in &plan.class_parameters {
            let (base, policy) = match slot {
                ClassSlot::Filesystem => (filesystem_class(cluster), fs),
                ClassSlot::Block => (block_class(cluster, false), block),
                ClassSlot::Object => (object_class(cluster), object),
            };
            configs.push(StorageClassConfiguration {
                storage_class: merge_parameters(base, Some(parameters)),
                strategy: policy.reconcile_strategy,
                disabled: policy.disable_storage_class,
                requires: None,
            });
        }
        return configs;
    }

    let mut configs = vec![
        StorageClassConfiguration {
            storage_class: filesystem_class(cluster),
            strategy: fs.reconcile_strategy,
            disabled: fs.disable_storage_class,
            requires: Some(Dependency::Filesystem(cluster.filesystem_name())),
        },
        StorageClassConfiguration {
            storage_class: block_class(cluster, false),
            strategy: block.reconcile_strategy,
            disabled: block.disable_storage_class,
            requires: Some(Dependency::BlockPool(cluster.block_pool_name())),
        },
        StorageClassConfiguration {
            storage_class: block_class(cluster, true),
            strategy: block.reconcile_strategy,
            disabled: block.disable_storage_class,
            requires: Some(Dependency::BlockPool(cluster.block_pool_name())),
        },
    ];
    if !platform.avoids_object_store() {
        configs.push(StorageClassConfiguration {
            storage_class: object_class(cluster),
            strategy: object.reconcile_strategy,
            disabled: object.disable_storage_class,
            requires: None,
        });
    }
    configs
}

/// Every class the cluster may have created, for deletion
pub fn teardown_configurations(
    cluster: &StorageCluster,
    platform: Platform,
) -> Vec<StorageClassConfiguration> {
    let managed = &cluster.spec.managed_resources;
    let mut configs = vec![
        (filesystem_class(cluster), &managed.filesystems),
        (block_class(cluster, false), &managed.block_pools),
        (block_class(cluster, true), &managed.block_pools),
    ];
    if cluster.is_external() || !platform.avoids_object_store() {
        configs.push((object_class(cluster), &managed.object_stores));
    }
    configs
        .into_iter()
        .map(|(storage_class, policy)| StorageClassConfiguration {
            storage_class,
            strategy: policy.reconcile_strategy,
            disabled: false,
            requires: None,
        })
        .collect()
}

// =============================================================================
// Lifecycle
// =============================================================================

async fn check_dependency<S: ResourceStore>(
    store: &S,
    namespace: &str,
    dependency: &Dependency,
) -> Result<()> {
    let (kind, name, phase) = match dependency {
        Dependency::BlockPool(name) => {
            let pool = store.get::<BlockPool>(namespace, name).await?;
            ("BlockPool", name, pool.map(|p| p.phase()))
        }
        Dependency::Filesystem(name) => {
            let fs = store.get::<Filesystem>(namespace, name).await?;
            ("Filesystem", name, fs.map(|f| f.phase()))
        }
    };

    let reason = match phase {
        None => "not found".to_string(),
        Some(None) => "not reporting status".to_string(),
        Some(Some(ResourcePhase::Ready)) => return Ok(()),
        Some(Some(phase)) => format!("phase is {}", phase),
    };
    Err(Error::DependencyNotReady {
        kind: kind.to_string(),
        name: name.clone(),
        reason,
    })
}

fn parameters_of(sc: &StorageClass) -> BTreeMap<String, String> {
    sc.parameters.clone().unwrap_or_default()
}

/// Gate on dependencies, then create or recreate every enabled class
pub async fn ensure<S: ResourceStore>(pass: &mut Pass<'_, S>) -> Result<()> {
    let namespace = pass.namespace();
    let configs = configurations(&pass.cluster, pass.config.platform, pass.external.as_ref());

    // Gate before any write so a blocked pass has no side effects
    for config in configs.iter().filter(|c| !c.skipped()) {
        if let Some(dependency) = &config.requires {
            check_dependency(pass.store, &namespace, dependency).await?;
        }
    }

    for config in configs {
        let name = config.name();
        if config.skipped() {
            debug!(%name, strategy = %config.strategy, "Storage class not reconciled");
            continue;
        }

        let Some(existing) = pass.store.get::<StorageClass>("", &name).await? else {
            info!(%name, "Creating storage class");
            pass.store.create("", &config.storage_class).await?;
            continue;
        };

        if config.strategy == ReconcileStrategy::Init {
            continue;
        }
        if existing.metadata.deletion_timestamp.is_some() {
            return Err(Error::MarkedForDeletion {
                kind: "StorageClass".to_string(),
                name,
            });
        }
        if parameters_of(&existing) == parameters_of(&config.storage_class) {
            continue;
        }

        info!(%name, "Storage class parameters changed, recreating");
        match pass.store.delete::<StorageClass>("", &name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        pass.store.create("", &config.storage_class).await?;
        pass.recreated_classes += 1;
    }
    Ok(())
}

/// Delete the cluster's storage classes; returns how many were deleted
pub async fn teardown<S: ResourceStore>(
    store: &S,
    cluster: &StorageCluster,
    config: &ReconcilerConfig,
) -> Result<usize> {
    let mut deleted = 0;
    for class in teardown_configurations(cluster, config.platform) {
        if class.skipped() {
            continue;
        }
        let name = class.name();
        let Some(existing) = store.get::<StorageClass>("", &name).await? else {
            continue;
        };
        if existing.metadata.deletion_timestamp.is_some() {
            continue;
        }
        info!(%name, "Deleting storage class");
        match store.delete::<StorageClass>("", &name).await {
            Ok(()) => deleted += 1,
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(deleted)
}
