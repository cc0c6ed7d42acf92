//! Reconciler configuration
//!
//! Defaults that shape every desired object: engine image and quorum size,
//! the node labels and taints storage daemons are scheduled against, the
//! platform and the probe timeout. Built once at startup and passed into
//! each pass.

use crate::crd::{LabelRequirement, Placement, Toleration, WeightedAffinityTerm};
use crate::domain::ports::Platform;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_ENGINE_IMAGE: &str = "quay.io/billyronks/storage-engine:v1.4";
pub const DEFAULT_DATA_DIR: &str = "/var/lib/storage-engine";
pub const DEFAULT_NODE_AFFINITY_KEY: &str = "cluster.storage.billyronks.io/storage";
pub const DEFAULT_TOLERATION_KEY: &str = "node.storage.billyronks.io/storage";
pub const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// Labels carried by the engine's data daemons and their prepare jobs
const DATA_DAEMON_APPS: [&str; 2] = ["engine-osd", "engine-osd-prepare"];

// =============================================================================
// Engine Defaults
// =============================================================================

/// Defaults for the engine cluster object
#[derive(Debug, Clone)]
pub struct EngineDefaults {
    /// Engine container image
    pub image: String,
    /// Monitor quorum size
    pub mon_count: u32,
    /// Host path for daemon data
    pub data_dir: String,
    /// Size of the monitor volume when derived from a device set
    pub mon_volume_size: String,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            image: DEFAULT_ENGINE_IMAGE.to_string(),
            mon_count: 3,
            data_dir: DEFAULT_DATA_DIR.to_string(),
            mon_volume_size: "10Gi".to_string(),
        }
    }
}

// =============================================================================
// Placement Defaults
// =============================================================================

/// Scheduling defaults for storage components
#[derive(Debug, Clone)]
pub struct PlacementDefaults {
    /// Node label marking storage nodes
    pub node_affinity_key: String,
    /// Taint storage daemons tolerate
    pub toleration_key: String,
}

impl Default for PlacementDefaults {
    fn default() -> Self {
        Self {
            node_affinity_key: DEFAULT_NODE_AFFINITY_KEY.to_string(),
            toleration_key: DEFAULT_TOLERATION_KEY.to_string(),
        }
    }
}

impl PlacementDefaults {
    /// Placement applied to every daemon: storage nodes only, storage taint tolerated
    pub fn all(&self) -> Placement {
        Placement {
            node_affinity: vec![LabelRequirement::exists(&self.node_affinity_key)],
            tolerations: vec![Toleration {
                key: self.toleration_key.clone(),
                operator: "Equal".to_string(),
                value: Some("true".to_string()),
                effect: Some("NoSchedule".to_string()),
            }],
            pod_anti_affinity: Vec::new(),
        }
    }

    /// Placement for device sets: as `all`, spread across hosts
    pub fn device_set(&self) -> Placement {
        let mut placement = self.all();
        placement.pod_anti_affinity.push(WeightedAffinityTerm {
            weight: 100,
            label_selector: vec![LabelRequirement::is_in("app", &DATA_DAEMON_APPS)],
            topology_key: HOSTNAME_TOPOLOGY_KEY.to_string(),
        });
        placement
    }

    /// Per-component placement: the cluster's override, else the `all` default
    pub fn for_component(
        &self,
        overrides: &BTreeMap<String, Placement>,
        component: &str,
    ) -> Placement {
        overrides
            .get(component)
            .cloned()
            .unwrap_or_else(|| self.all())
    }
}

// =============================================================================
// Reconciler Configuration
// =============================================================================

/// Configuration for the reconciler
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub engine: EngineDefaults,
    pub placement: PlacementDefaults,
    /// Platform the cluster runs on
    pub platform: Platform,
    /// Bound on each external endpoint reachability probe
    pub probe_timeout: Duration,
    /// Namespace the engine installs alerting rules into
    pub monitoring_rules_namespace: Option<String>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            engine: EngineDefaults::default(),
            placement: PlacementDefaults::default(),
            platform: Platform::None,
            probe_timeout: Duration::from_secs(5),
            monitoring_rules_namespace: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.engine.mon_count, 3);
        assert_eq!(config.engine.data_dir, "/var/lib/storage-engine");
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.platform, Platform::None);
    }

    #[test]
    fn test_device_set_placement_spreads_across_hosts() {
        let defaults = PlacementDefaults::default();
        let placement = defaults.device_set();

        assert_eq!(placement.node_affinity, defaults.all().node_affinity);
        assert_eq!(placement.pod_anti_affinity.len(), 1);
        assert_eq!(placement.pod_anti_affinity[0].weight, 100);
        assert_eq!(
            placement.pod_anti_affinity[0].topology_key,
            "kubernetes.io/hostname"
        );
    }

    #[test]
    fn test_component_override_wins() {
        let defaults = PlacementDefaults::default();
        let mut overrides = BTreeMap::new();
        overrides.insert("mds".to_string(), Placement::default());

        assert_eq!(defaults.for_component(&overrides, "mds"), Placement::default());
        assert_eq!(defaults.for_component(&overrides, "rgw"), defaults.all());
    }
}
