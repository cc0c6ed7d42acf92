//! Node topology and failure domain
//!
//! Collects topology label values across the storage nodes into status and
//! picks the failure domain pools spread replicas across. The failure domain
//! is chosen once, from the first pass that sees a storage node, and never
//! changes afterwards. Until then pools carry no failure domain.

use crate::controlplane::config::HOSTNAME_TOPOLOGY_KEY;
use crate::controlplane::pass::Pass;
use crate::crd::NodeTopologyMap;
use crate::domain::ports::ResourceStore;
use crate::error::Result;
use k8s_openapi::api::core::v1::Node;
use tracing::{debug, info};

pub const ZONE_TOPOLOGY_KEY: &str = "topology.kubernetes.io/zone";
pub const REGION_TOPOLOGY_KEY: &str = "topology.kubernetes.io/region";
pub const RACK_TOPOLOGY_KEY: &str = "topology.storage.billyronks.io/rack";

const TOPOLOGY_KEYS: [&str; 4] = [
    ZONE_TOPOLOGY_KEY,
    REGION_TOPOLOGY_KEY,
    RACK_TOPOLOGY_KEY,
    HOSTNAME_TOPOLOGY_KEY,
];

/// Minimum distinct zones for zone-level replication
const MIN_FAILURE_ZONES: usize = 3;

pub async fn ensure<S: ResourceStore>(pass: &mut Pass<'_, S>) -> Result<()> {
    let selector = pass.config.placement.node_affinity_key.clone();
    let nodes: Vec<Node> = pass.store.list("", &selector).await?;
    if nodes.is_empty() {
        debug!(%selector, "No storage nodes labelled yet");
    }

    let topology = collect(&nodes);
    let flexible = pass.cluster.spec.flexible_scaling;
    let status = pass.cluster.status_mut();
    if status.failure_domain.is_none() && (flexible || !nodes.is_empty()) {
        let domain = failure_domain(&topology, flexible);
        info!(failure_domain = domain, nodes = nodes.len(), "Failure domain chosen");
        status.failure_domain = Some(domain.to_string());
    }
    status.node_topologies = Some(topology);
    Ok(())
}

pub fn collect(nodes: &[Node]) -> NodeTopologyMap {
    let mut map = NodeTopologyMap::default();
    for labels in nodes.iter().filter_map(|n| n.metadata.labels.as_ref()) {
        for key in TOPOLOGY_KEYS {
            if let Some(value) = labels.get(key) {
                map.add(key, value);
            }
        }
    }
    map
}

pub fn failure_domain(topology: &NodeTopologyMap, flexible_scaling: bool) -> &'static str {
    if flexible_scaling {
        "host"
    } else if topology.values(ZONE_TOPOLOGY_KEY).len() >= MIN_FAILURE_ZONES {
        "zone"
    } else {
        "rack"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn node(name: &str, zone: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.into()),
                labels: Some(BTreeMap::from([
                    (ZONE_TOPOLOGY_KEY.to_string(), zone.to_string()),
                    (HOSTNAME_TOPOLOGY_KEY.to_string(), name.to_string()),
                ])),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_zone_failure_domain() {
        let nodes = vec![node("n1", "a"), node("n2", "b"), node("n3", "c"), node("n4", "a")];
        let topology = collect(&nodes);
        assert_eq!(topology.values(ZONE_TOPOLOGY_KEY).len(), 3);
        assert_eq!(topology.values(HOSTNAME_TOPOLOGY_KEY).len(), 4);
        assert_eq!(failure_domain(&topology, false), "zone");
        assert_eq!(failure_domain(&topology, true), "host");
    }

    #[test]
    fn test_rack_fallback() {
        let topology = collect(&[node("n1", "a"), node("n2", "b")]);
        assert_eq!(failure_domain(&topology, false), "rack");
        assert_eq!(failure_domain(&NodeTopologyMap::default(), false), "rack");
    }
}
