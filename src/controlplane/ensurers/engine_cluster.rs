//! EngineCluster ensurer
//!
//! Builds the engine cluster object from the StorageCluster spec. Internal
//! mode describes monitors, managers and device sets; external mode only
//! points the engine at the existing cluster and its metrics endpoint.

use super::{converge, Convergent, Outcome};
use crate::controlplane::config::ReconcilerConfig;
use crate::controlplane::external::ExternalPlan;
use crate::controlplane::pass::Pass;
use crate::crd::{
    ClusterState, DeviceSet, DisruptionManagement, EngineCluster, EngineClusterSpec, ExternalSpec,
    MgrModule, MonSpec, MonitoringSpec, NetworkSpec, Placement, ReconcileStrategy, StorageCluster,
    StorageScope, VolumeTemplate,
};
use crate::domain::conditions::{Condition, ConditionStatus, ConditionType, Conditions};
use crate::domain::ports::ResourceStore;
use crate::error::Result;
use kube::ResourceExt;
use std::collections::BTreeMap;

const DEFAULT_DEVICE_SET_REPLICA: u32 = 3;
const ENGINE_REASON_NOT_REPORTING: &str = "EngineClusterNotReporting";

pub async fn ensure<S: ResourceStore>(pass: &mut Pass<'_, S>) -> Result<Outcome> {
    let desired = desired(&pass.cluster, pass.config, pass.external.as_ref());
    converge(pass, desired, ReconcileStrategy::Manage).await
}

/// The engine cluster the StorageCluster asks for
pub fn desired(
    cluster: &StorageCluster,
    config: &ReconcilerConfig,
    external: Option<&ExternalPlan>,
) -> EngineCluster {
    let spec = if cluster.is_external() {
        external_spec(config, external)
    } else {
        internal_spec(cluster, config)
    };

    let mut engine = EngineCluster::new(&cluster.engine_cluster_name(), spec);
    engine.metadata.namespace = Some(cluster.namespace_or_default());
    engine.metadata.labels = Some(BTreeMap::from([("app".to_string(), cluster.name_any())]));
    engine
}

fn internal_spec(cluster: &StorageCluster, config: &ReconcilerConfig) -> EngineClusterSpec {
    let overrides = &cluster.spec.placement;

    let mut placement = BTreeMap::new();
    placement.insert("all".to_string(), config.placement.for_component(overrides, "all"));
    for component in ["mon", "mgr"] {
        if let Some(p) = overrides.get(component) {
            placement.insert(component.to_string(), p.clone());
        }
    }

    EngineClusterSpec {
        image: config.engine.image.clone(),
        data_dir_host_path: cluster
            .spec
            .mon_data_dir_host_path
            .clone()
            .unwrap_or_else(|| config.engine.data_dir.clone()),
        mon: MonSpec {
            count: config.engine.mon_count,
            allow_multiple_per_node: false,
            volume_template: mon_volume_template(cluster, config),
        },
        mgr_modules: vec![MgrModule {
            name: "pg_autoscaler".to_string(),
            enabled: true,
        }],
        network: NetworkSpec {
            host_network: cluster.spec.host_network,
        },
        monitoring: MonitoringSpec {
            enabled: true,
            rules_namespace: Some(
                config
                    .monitoring_rules_namespace
                    .clone()
                    .unwrap_or_else(|| cluster.namespace_or_default()),
            ),
            ..Default::default()
        },
        storage: StorageScope {
            device_sets: device_sets(cluster, &config.placement.device_set()),
            topology_aware: true,
        },
        placement,
        disruption_management: DisruptionManagement {
            manage_pod_budgets: true,
        },
        external: ExternalSpec { enable: false },
    }
}

fn external_spec(config: &ReconcilerConfig, external: Option<&ExternalPlan>) -> EngineClusterSpec {
    let monitoring = external.and_then(|plan| plan.monitoring.as_ref());

    EngineClusterSpec {
        image: config.engine.image.clone(),
        data_dir_host_path: config.engine.data_dir.clone(),
        monitoring: MonitoringSpec {
            enabled: monitoring.is_some(),
            rules_namespace: config.monitoring_rules_namespace.clone(),
            external_mgr_endpoints: monitoring.map(|m| vec![m.host.clone()]).unwrap_or_default(),
            external_mgr_prometheus_port: monitoring.map(|m| m.port),
        },
        external: ExternalSpec { enable: true },
        ..Default::default()
    }
}

/// Explicit template, else the first device set's storage class
fn mon_volume_template(cluster: &StorageCluster, config: &ReconcilerConfig) -> Option<VolumeTemplate> {
    if let Some(template) = &cluster.spec.mon_pvc_template {
        return Some(template.clone());
    }
    cluster.spec.storage_device_sets.first().map(|ds| VolumeTemplate {
        storage_class_name: ds.data_pvc_template.storage_class_name.clone(),
        storage: config.engine.mon_volume_size.clone(),
        volume_mode: None,
    })
}

/// One engine device set per replica of each StorageCluster device set
fn device_sets(cluster: &StorageCluster, default_placement: &Placement) -> Vec<DeviceSet> {
    cluster
        .spec
        .storage_device_sets
        .iter()
        .flat_map(|ds| {
            let replica = ds.replica.unwrap_or(DEFAULT_DEVICE_SET_REPLICA);
            (0..replica).map(move |i| DeviceSet {
                name: format!("{}-{}", ds.name, i),
                count: ds.count,
                portable: ds.portable,
                tune_slow_device_class: ds.config.tune_slow_device_class,
                device_class: ds.device_type.as_ref().map(|t| t.to_lowercase()),
                placement: ds
                    .placement
                    .clone()
                    .unwrap_or_else(|| default_placement.clone()),
                resources: ds.resources.clone(),
                volume_templates: vec![ds.data_pvc_template.clone()],
            })
        })
        .collect()
}

impl Convergent for EngineCluster {
    type Spec = EngineClusterSpec;

    fn spec(&self) -> &EngineClusterSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut EngineClusterSpec {
        &mut self.spec
    }

    fn report(&self, conditions: &mut Conditions) {
        report_state(self.state(), self.status_message(), conditions);
    }

    /// A device set present on both sides whose count grows
    fn expands_to(&self, desired: &EngineClusterSpec) -> bool {
        self.spec.storage.device_sets.iter().any(|current| {
            desired
                .storage
                .device_sets
                .iter()
                .any(|d| d.name == current.name && d.count > current.count)
        })
    }
}

/// Map the engine's reported state to conditions
pub fn report_state(state: Option<ClusterState>, message: &str, conditions: &mut Conditions) {
    use ConditionStatus::{False, True};

    let reason = match state {
        Some(s) => format!("ClusterState{}", s),
        None => ENGINE_REASON_NOT_REPORTING.to_string(),
    };
    let mut set = |kind: ConditionType, status: ConditionStatus, text: String| {
        conditions.set(Condition::new(kind, status, reason.clone(), text));
    };

    match state {
        None => {
            let text = "EngineCluster resource is not reporting status".to_string();
            set(ConditionType::Available, False, text.clone());
            set(ConditionType::Progressing, True, text.clone());
            set(ConditionType::Degraded, False, text.clone());
            set(ConditionType::Upgradeable, False, text);
        }
        Some(ClusterState::Creating) => {
            set(ConditionType::Progressing, True, format!("EngineCluster is creating: {}", message));
        }
        Some(ClusterState::Updating) => {
            let text = format!("EngineCluster is updating: {}", message);
            set(ConditionType::Progressing, True, text.clone());
            set(ConditionType::Upgradeable, False, text);
        }
        Some(ClusterState::Error) => {
            let text = format!("EngineCluster error: {}", message);
            set(ConditionType::Available, False, text.clone());
            set(ConditionType::Degraded, True, text);
        }
        Some(ClusterState::Connecting) => {
            set(
                ConditionType::ExternalClusterConnecting,
                True,
                format!("Connecting to external cluster: {}", message),
            );
        }
        Some(ClusterState::Connected) => {
            set(
                ConditionType::ExternalClusterConnected,
                True,
                "Connected to external cluster".to_string(),
            );
        }
        Some(ClusterState::Created) | Some(ClusterState::Unknown) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::external::Endpoint;
    use crate::crd::{StorageClusterSpec, StorageDeviceSet};

    fn cluster() -> StorageCluster {
        let mut sc = StorageCluster::new(
            "ocs",
            StorageClusterSpec {
                storage_device_sets: vec![StorageDeviceSet {
                    name: "ssd".into(),
                    count: 1,
                    data_pvc_template: VolumeTemplate {
                        storage_class_name: Some("gp3".into()),
                        storage: "512Gi".into(),
                        volume_mode: Some("Block".into()),
                    },
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        sc.metadata.namespace = Some("storage".into());
        sc
    }

    #[test]
    fn test_internal_defaults() {
        let config = ReconcilerConfig::default();
        let engine = desired(&cluster(), &config, None);

        assert_eq!(engine.metadata.namespace.as_deref(), Some("storage"));
        assert_eq!(engine.spec.mon.count, 3);
        assert!(!engine.spec.mon.allow_multiple_per_node);
        assert_eq!(engine.spec.data_dir_host_path, "/var/lib/storage-engine");
        assert_eq!(engine.spec.mgr_modules[0].name, "pg_autoscaler");
        assert!(engine.spec.storage.topology_aware);
        assert!(engine.spec.disruption_management.manage_pod_budgets);
        assert_eq!(engine.spec.placement["all"], config.placement.all());

        let mon_volume = engine.spec.mon.volume_template.unwrap();
        assert_eq!(mon_volume.storage_class_name.as_deref(), Some("gp3"));
        assert_eq!(mon_volume.storage, "10Gi");
    }

    #[test]
    fn test_device_sets_expand_per_replica_with_default_placement() {
        let config = ReconcilerConfig::default();
        let engine = desired(&cluster(), &config, None);
        let sets = &engine.spec.storage.device_sets;

        let names: Vec<_> = sets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["ssd-0", "ssd-1", "ssd-2"]);
        assert!(sets.iter().all(|s| s.placement == config.placement.device_set()));
    }

    #[test]
    fn test_desired_is_deterministic() {
        let config = ReconcilerConfig::default();
        assert_eq!(
            desired(&cluster(), &config, None),
            desired(&cluster(), &config, None)
        );
    }

    #[test]
    fn test_external_spec_carries_monitoring_endpoint() {
        let mut sc = cluster();
        sc.spec.external_storage.enable = true;
        let plan = ExternalPlan {
            monitoring: Some(Endpoint {
                host: "10.1.0.5".into(),
                port: 9283,
            }),
            ..Default::default()
        };

        let engine = desired(&sc, &ReconcilerConfig::default(), Some(&plan));
        assert!(engine.spec.external.enable);
        assert!(engine.spec.monitoring.enabled);
        assert_eq!(engine.spec.monitoring.external_mgr_endpoints, ["10.1.0.5"]);
        assert_eq!(engine.spec.monitoring.external_mgr_prometheus_port, Some(9283));
        assert!(engine.spec.storage.device_sets.is_empty());
    }

    #[test]
    fn test_expansion_detection() {
        let config = ReconcilerConfig::default();
        let current = desired(&cluster(), &config, None);

        let mut bigger = cluster();
        bigger.spec.storage_device_sets[0].count = 2;
        let grown = desired(&bigger, &config, None);
        assert!(current.expands_to(&grown.spec));
        assert!(!grown.expands_to(&current.spec));

        let mut more_replicas = cluster();
        more_replicas.spec.storage_device_sets[0].replica = Some(4);
        assert!(!current.expands_to(&desired(&more_replicas, &config, None).spec));
    }

    #[test]
    fn test_state_mapping() {
        let mut conditions = Conditions::new();
        report_state(None, "", &mut conditions);
        assert!(conditions.is_false(ConditionType::Available));
        assert!(conditions.is_true(ConditionType::Progressing));
        assert!(conditions.is_false(ConditionType::Upgradeable));

        let mut conditions = Conditions::new();
        report_state(Some(ClusterState::Error), "mon quorum lost", &mut conditions);
        assert!(conditions.is_true(ConditionType::Degraded));
        assert!(conditions.get(ConditionType::Degraded).unwrap().message.contains("quorum"));

        let mut conditions = Conditions::new();
        report_state(Some(ClusterState::Connected), "", &mut conditions);
        assert!(conditions.is_true(ConditionType::ExternalClusterConnected));

        let mut conditions = Conditions::new();
        report_state(Some(ClusterState::Created), "", &mut conditions);
        assert!(conditions.is_empty());
    }
}
