//! End-to-end reconcile passes against the in-memory store

use assert_matches::assert_matches;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Node, Secret};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use storage_cluster_operator::controlplane::config::DEFAULT_NODE_AFFINITY_KEY;
use storage_cluster_operator::controlplane::ensurers::topology::ZONE_TOPOLOGY_KEY;
use storage_cluster_operator::controlplane::external::{EXTERNAL_SECRET_KEY, EXTERNAL_SECRET_NAME};
use storage_cluster_operator::controlplane::store::OpKind;
use storage_cluster_operator::crd::{
    BlockPool, ExternalStorageSpec, Filesystem, ObjectStore, ReconcileStrategy,
    StorageClusterInitialization, StorageDeviceSet, VolumeTemplate, STORAGE_CLUSTER_FINALIZER,
};
use storage_cluster_operator::{
    ConditionType, EndpointProber, EngineCluster, Error, ErrorAction, MemoryStore, Phase,
    Platform, Readiness, ReconcileMetrics, Reconciler, ReconcilerConfig, ResourceStore, Result,
    StorageCluster, StorageClusterSpec,
};

const NS: &str = "storage";
const NAME: &str = "ocs";

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default)]
struct FakeProber {
    calls: AtomicUsize,
    unreachable: AtomicBool,
}

impl FakeProber {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EndpointProber for FakeProber {
    async fn probe(&self, host: &str, port: u16, _timeout: Duration) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::EndpointUnreachable {
                endpoint: format!("{}:{}", host, port),
                reason: "connection refused".into(),
            });
        }
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    prober: Arc<FakeProber>,
    reconciler: Reconciler<MemoryStore>,
}

impl Harness {
    fn new(platform: Platform, spec: StorageClusterSpec) -> Self {
        let store = Arc::new(MemoryStore::new());
        let prober = Arc::new(FakeProber::default());
        let config = ReconcilerConfig {
            platform,
            ..Default::default()
        };
        let reconciler = Reconciler::new(
            store.clone(),
            config,
            prober.clone(),
            Readiness::new(),
            ReconcileMetrics::new().unwrap(),
        );

        let mut cluster = StorageCluster::new(NAME, spec);
        cluster.metadata.namespace = Some(NS.into());
        store.insert(&cluster).unwrap();

        Self {
            store,
            prober,
            reconciler,
        }
    }

    async fn pass(&self) -> Result<()> {
        self.reconciler.reconcile(NS, NAME).await
    }

    fn cluster(&self) -> StorageCluster {
        self.store.peek(NS, NAME).unwrap()
    }

    /// Report every engine resource as healthy
    fn engine_reports_ready(&self) {
        self.store
            .set_status::<EngineCluster>(NS, NAME, json!({"state": "Created"}));
        let ready = json!({"phase": "Ready"});
        self.store
            .set_status::<BlockPool>(NS, "ocs-blockpool", ready.clone());
        self.store
            .set_status::<Filesystem>(NS, "ocs-filesystem", ready.clone());
        self.store
            .set_status::<ObjectStore>(NS, "ocs-objectstore", ready);
    }

    async fn converged(&self) {
        let _ = self.pass().await;
        self.engine_reports_ready();
        self.pass().await.unwrap();
    }

    fn class_names(&self) -> Vec<String> {
        ["ocs-fs", "ocs-block", "ocs-block-thick", "ocs-object"]
            .into_iter()
            .filter(|n| self.store.peek::<StorageClass>("", n).is_some())
            .map(String::from)
            .collect()
    }
}

fn storage_node(name: &str, zone: &str) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(BTreeMap::from([
                (DEFAULT_NODE_AFFINITY_KEY.to_string(), String::new()),
                (ZONE_TOPOLOGY_KEY.to_string(), zone.to_string()),
            ])),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn internal_spec() -> StorageClusterSpec {
    StorageClusterSpec {
        storage_device_sets: vec![StorageDeviceSet {
            name: "set1".into(),
            count: 1,
            data_pvc_template: VolumeTemplate {
                storage_class_name: Some("gp2".into()),
                storage: "512Gi".into(),
                volume_mode: Some("Block".into()),
            },
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn external_spec() -> StorageClusterSpec {
    StorageClusterSpec {
        external_storage: ExternalStorageSpec { enable: true },
        ..Default::default()
    }
}

const EXTERNAL_PAYLOAD: &str = r#"[
    {"kind": "EngineCluster", "name": "monitoring", "data": {"MonitoringEndpoint": "10.1.0.5", "MonitoringPort": "9283"}},
    {"kind": "ConfigMap", "name": "mon-endpoints", "data": {"data": "a=10.1.0.1:6789", "maxMonId": "0"}},
    {"kind": "Secret", "name": "engine-admin", "data": {"userID": "admin", "userKey": "s3cr3t"}},
    {"kind": "StorageClass", "name": "block", "data": {"pool": "replicapool"}},
    {"kind": "StorageClass", "name": "object", "data": {"endpoint": "10.1.0.9:8080"}}
]"#;

fn external_secret(payload: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(EXTERNAL_SECRET_NAME.into()),
            namespace: Some(NS.into()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            EXTERNAL_SECRET_KEY.to_string(),
            ByteString(payload.as_bytes().to_vec()),
        )])),
        ..Default::default()
    }
}

async fn replace_payload(store: &MemoryStore, payload: &str) {
    let mut secret: Secret = store.peek(NS, EXTERNAL_SECRET_NAME).unwrap();
    secret.data = external_secret(payload).data;
    store.replace(NS, &secret).await.unwrap();
}

// =============================================================================
// Internal mode
// =============================================================================

#[tokio::test]
async fn fresh_cluster_waits_for_pools_then_creates_classes() {
    let h = Harness::new(Platform::BareMetal, internal_spec());

    let err = h.pass().await.unwrap_err();
    assert_matches!(err, Error::DependencyNotReady { .. });
    assert!(err.is_retryable());

    let engine: EngineCluster = h.store.peek(NS, NAME).unwrap();
    assert_eq!(engine.spec.mon.count, 3);
    assert_eq!(engine.spec.storage.device_sets.len(), 3);
    assert!(h.store.peek::<StorageClusterInitialization>(NS, NAME).is_some());
    assert_eq!(h.store.count(OpKind::Create, "StorageClass"), 0);
    assert_eq!(h.cluster().phase(), Some(Phase::Error));

    // Still blocked while the pools report nothing
    assert_matches!(h.pass().await, Err(Error::DependencyNotReady { .. }));

    h.engine_reports_ready();
    h.pass().await.unwrap();

    assert_eq!(
        h.class_names(),
        ["ocs-fs", "ocs-block", "ocs-block-thick", "ocs-object"]
    );
    let cluster = h.cluster();
    assert_eq!(cluster.phase(), Some(Phase::Ready));
    assert!(cluster
        .conditions()
        .unwrap()
        .is_true(ConditionType::ReconcileComplete));
    assert!(h.reconciler.readiness().is_ready());
    assert_eq!(cluster.finalizers(), [STORAGE_CLUSTER_FINALIZER.to_string()]);
}

#[tokio::test]
async fn failure_domain_waits_for_labelled_nodes() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    let _ = h.pass().await;

    let status = h.cluster().status.unwrap();
    assert!(status.failure_domain.is_none());
    let pool: BlockPool = h.store.peek(NS, "ocs-blockpool").unwrap();
    assert!(pool.spec.pool.failure_domain.is_none());

    for (name, zone) in [("n1", "a"), ("n2", "b"), ("n3", "c")] {
        h.store.insert(&storage_node(name, zone)).unwrap();
    }
    let _ = h.pass().await;

    let status = h.cluster().status.unwrap();
    assert_eq!(status.failure_domain.as_deref(), Some("zone"));
    let pool: BlockPool = h.store.peek(NS, "ocs-blockpool").unwrap();
    assert_eq!(pool.spec.pool.failure_domain.as_deref(), Some("zone"));

    // Chosen once: losing a zone later does not move it
    h.store.insert(&storage_node("n3", "a")).unwrap();
    let _ = h.pass().await;
    assert_eq!(h.cluster().status.unwrap().failure_domain.as_deref(), Some("zone"));
}

#[tokio::test]
async fn duplicate_device_sets_wait_for_an_edit() {
    let mut spec = internal_spec();
    spec.storage_device_sets.push(spec.storage_device_sets[0].clone());
    let h = Harness::new(Platform::BareMetal, spec);

    let err = h.pass().await.unwrap_err();
    assert_matches!(err, Error::Configuration(_));
    assert_eq!(err.action(), ErrorAction::NoRequeue);
    assert!(!err.is_retryable());
    assert!(h.store.peek::<EngineCluster>(NS, NAME).is_none());
    assert_eq!(h.cluster().phase(), Some(Phase::Error));
}

#[tokio::test]
async fn object_avoiding_platform_gets_no_object_class() {
    let h = Harness::new(Platform::Aws, internal_spec());
    h.converged().await;

    assert_eq!(h.class_names(), ["ocs-fs", "ocs-block", "ocs-block-thick"]);
    assert!(h.store.peek::<ObjectStore>(NS, "ocs-objectstore").is_none());
}

#[tokio::test]
async fn converged_cluster_pass_writes_nothing() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    h.converged().await;
    // Related objects are recorded on the first pass that finds them
    h.pass().await.unwrap();

    h.store.clear_ops();
    h.pass().await.unwrap();
    assert!(h.store.writes().is_empty(), "{:?}", h.store.writes());
    assert!(h.store.count(OpKind::Get, "StorageClass") > 0);
}

#[tokio::test]
async fn drifted_engine_cluster_is_restored_in_one_pass() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    h.converged().await;

    let mut engine: EngineCluster = h.store.peek(NS, NAME).unwrap();
    engine.spec.mon.count = 1;
    h.store.replace(NS, &engine).await.unwrap();

    h.store.clear_ops();
    h.pass().await.unwrap();
    assert_eq!(h.store.count(OpKind::Replace, "EngineCluster"), 1);
    let engine: EngineCluster = h.store.peek(NS, NAME).unwrap();
    assert_eq!(engine.spec.mon.count, 3);
}

#[tokio::test]
async fn drifted_storage_class_is_deleted_and_recreated() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    h.converged().await;

    let mut class: StorageClass = h.store.peek("", "ocs-block").unwrap();
    class
        .parameters
        .get_or_insert_with(BTreeMap::new)
        .insert("imageFeatures".into(), "layering,exclusive-lock".into());
    h.store.replace("", &class).await.unwrap();

    h.store.clear_ops();
    h.pass().await.unwrap();
    assert_eq!(h.store.count(OpKind::Delete, "StorageClass"), 1);
    assert_eq!(h.store.count(OpKind::Create, "StorageClass"), 1);
    assert_eq!(h.store.count(OpKind::Replace, "StorageClass"), 0);
    assert_eq!(h.reconciler.metrics().recreations(), 1);

    let class: StorageClass = h.store.peek("", "ocs-block").unwrap();
    assert_eq!(class.parameters.unwrap()["imageFeatures"], "layering");
}

#[tokio::test]
async fn ignored_block_pools_are_never_touched() {
    let mut spec = internal_spec();
    spec.managed_resources.block_pools.reconcile_strategy = ReconcileStrategy::Ignore;
    let h = Harness::new(Platform::BareMetal, spec);
    h.converged().await;

    assert!(h.store.ops().iter().all(|op| op.kind != "BlockPool"));
    assert_eq!(h.class_names(), ["ocs-fs", "ocs-object"]);
}

#[tokio::test]
async fn init_filesystem_is_created_once_and_left_alone() {
    let mut spec = internal_spec();
    spec.managed_resources.filesystems.reconcile_strategy = ReconcileStrategy::Init;
    let h = Harness::new(Platform::BareMetal, spec);
    h.converged().await;
    assert_eq!(h.store.count(OpKind::Create, "Filesystem"), 1);

    let mut fs: Filesystem = h.store.peek(NS, "ocs-filesystem").unwrap();
    fs.spec.metadata_server.active_count = 2;
    h.store.replace(NS, &fs).await.unwrap();

    h.store.clear_ops();
    h.pass().await.unwrap();
    assert_eq!(h.store.count(OpKind::Replace, "Filesystem"), 0);
    let fs: Filesystem = h.store.peek(NS, "ocs-filesystem").unwrap();
    assert_eq!(fs.spec.metadata_server.active_count, 2);
}

#[tokio::test]
async fn growing_a_device_set_reports_expanding() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    h.converged().await;

    let mut cluster = h.cluster();
    cluster.spec.storage_device_sets[0].count = 2;
    h.store.replace(NS, &cluster).await.unwrap();

    h.pass().await.unwrap();
    assert_eq!(h.cluster().phase(), Some(Phase::Expanding));
}

#[tokio::test]
async fn engine_without_state_keeps_cluster_not_ready() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    h.converged().await;
    h.store
        .set_status::<EngineCluster>(NS, NAME, serde_json::Value::Null);

    h.pass().await.unwrap();
    let cluster = h.cluster();
    assert_eq!(cluster.phase(), Some(Phase::NotReady));
    assert!(cluster.conditions().unwrap().is_false(ConditionType::Upgradeable));
    assert!(!h.reconciler.readiness().is_ready());
}

#[tokio::test]
async fn deletion_tears_down_classes_and_releases_finalizer() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    h.converged().await;
    assert_eq!(h.class_names().len(), 4);

    h.store.mark_for_deletion::<StorageCluster>(NS, NAME);
    h.pass().await.unwrap();

    assert!(h.class_names().is_empty());
    let cluster = h.cluster();
    assert!(cluster.finalizers().is_empty());
    assert_eq!(cluster.phase(), Some(Phase::Deleting));
}

#[tokio::test]
async fn teardown_leaves_classes_already_being_deleted() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    h.converged().await;
    h.store.mark_for_deletion::<StorageClass>("", "ocs-block");

    h.store.clear_ops();
    h.store.mark_for_deletion::<StorageCluster>(NS, NAME);
    h.pass().await.unwrap();

    assert_eq!(h.store.count(OpKind::Delete, "StorageClass"), 3);
    assert_eq!(h.class_names(), ["ocs-block"]);
    assert!(h.cluster().finalizers().is_empty());
}

#[tokio::test]
async fn teardown_treats_missing_classes_as_removed() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    h.converged().await;
    h.store.delete::<StorageClass>("", "ocs-fs").await.unwrap();

    h.store.clear_ops();
    h.store.mark_for_deletion::<StorageCluster>(NS, NAME);
    h.pass().await.unwrap();

    assert_eq!(h.store.count(OpKind::Delete, "StorageClass"), 3);
    assert!(h.class_names().is_empty());
    assert!(h.cluster().finalizers().is_empty());
}

#[tokio::test]
async fn managed_class_being_deleted_fails_the_pass() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    h.converged().await;
    h.store.mark_for_deletion::<StorageClass>("", "ocs-block");

    h.store.clear_ops();
    let err = h.pass().await.unwrap_err();
    assert_matches!(
        err,
        Error::MarkedForDeletion { ref kind, ref name } if kind == "StorageClass" && name == "ocs-block"
    );
    assert_eq!(err.action(), ErrorAction::RequeueAfter(Duration::from_secs(30)));
    assert_eq!(h.store.count(OpKind::Delete, "StorageClass"), 0);
    assert_eq!(h.store.count(OpKind::Create, "StorageClass"), 0);
    assert_eq!(h.cluster().phase(), Some(Phase::Error));
}

#[tokio::test]
async fn managed_pool_being_deleted_is_not_restored() {
    let h = Harness::new(Platform::BareMetal, internal_spec());
    h.converged().await;
    h.store.mark_for_deletion::<BlockPool>(NS, "ocs-blockpool");

    h.store.clear_ops();
    let err = h.pass().await.unwrap_err();
    assert_matches!(err, Error::MarkedForDeletion { ref kind, .. } if kind == "BlockPool");
    assert_eq!(h.store.count(OpKind::Replace, "BlockPool"), 0);
    assert_eq!(h.store.count(OpKind::Create, "BlockPool"), 0);
}

#[tokio::test]
async fn init_class_with_drifted_parameters_is_left_alone() {
    let mut spec = internal_spec();
    spec.managed_resources.block_pools.reconcile_strategy = ReconcileStrategy::Init;
    let h = Harness::new(Platform::BareMetal, spec);
    h.converged().await;
    assert_eq!(h.class_names().len(), 4);

    let mut class: StorageClass = h.store.peek("", "ocs-block").unwrap();
    class
        .parameters
        .get_or_insert_with(BTreeMap::new)
        .insert("imageFeatures".into(), "layering,exclusive-lock".into());
    h.store.replace("", &class).await.unwrap();

    h.store.clear_ops();
    h.pass().await.unwrap();
    assert_eq!(h.store.count(OpKind::Delete, "StorageClass"), 0);
    assert_eq!(h.store.count(OpKind::Create, "StorageClass"), 0);
    assert_eq!(h.reconciler.metrics().recreations(), 0);
    let class: StorageClass = h.store.peek("", "ocs-block").unwrap();
    assert_eq!(
        class.parameters.unwrap()["imageFeatures"],
        "layering,exclusive-lock"
    );
}

// =============================================================================
// External mode
// =============================================================================

#[tokio::test]
async fn external_payload_is_dispatched_and_checksum_committed() {
    let h = Harness::new(Platform::Aws, external_spec());
    h.store.insert(&external_secret(EXTERNAL_PAYLOAD)).unwrap();

    h.pass().await.unwrap();
    assert_eq!(h.prober.calls(), 2);
    assert!(h.store.peek::<ConfigMap>(NS, "mon-endpoints").is_some());
    let secret: Secret = h.store.peek(NS, "engine-admin").unwrap();
    assert_eq!(secret.owner_references()[0].name, NAME);

    let engine: EngineCluster = h.store.peek(NS, NAME).unwrap();
    assert!(engine.spec.external.enable);
    assert_eq!(engine.spec.monitoring.external_mgr_endpoints, ["10.1.0.5".to_string()]);

    let store: ObjectStore = h.store.peek(NS, "ocs-objectstore").unwrap();
    assert_eq!(store.spec.gateway.port, 8080);

    assert_eq!(h.class_names(), ["ocs-block", "ocs-object"]);
    let block: StorageClass = h.store.peek("", "ocs-block").unwrap();
    assert_eq!(block.parameters.unwrap()["pool"], "replicapool");
    assert!(h.store.peek::<BlockPool>(NS, "ocs-blockpool").is_none());

    assert!(h.cluster().status.unwrap().external_secret_hash.is_some());
}

#[tokio::test]
async fn unchanged_payload_skips_dispatch_but_converges_classes() {
    let h = Harness::new(Platform::Aws, external_spec());
    h.store.insert(&external_secret(EXTERNAL_PAYLOAD)).unwrap();
    h.pass().await.unwrap();
    let hash = h.cluster().status.unwrap().external_secret_hash;

    h.store.clear_ops();
    h.pass().await.unwrap();
    assert_eq!(h.prober.calls(), 2);
    assert_eq!(h.store.count(OpKind::Get, "ConfigMap"), 0);
    assert!(h.store.count(OpKind::Get, "StorageClass") > 0);
    assert_eq!(h.cluster().status.unwrap().external_secret_hash, hash);
}

#[tokio::test]
async fn any_byte_change_in_payload_is_dispatched_again() {
    let h = Harness::new(Platform::Aws, external_spec());
    h.store.insert(&external_secret(EXTERNAL_PAYLOAD)).unwrap();
    h.pass().await.unwrap();
    let first = h.cluster().status.unwrap().external_secret_hash;

    // Same records in a different order
    let reordered: Vec<serde_json::Value> = {
        let mut records: Vec<serde_json::Value> = serde_json::from_str(EXTERNAL_PAYLOAD).unwrap();
        records.reverse();
        records
    };
    replace_payload(&h.store, &serde_json::to_string_pretty(&reordered).unwrap()).await;
    h.pass().await.unwrap();
    assert_eq!(h.prober.calls(), 4);
    let second = h.cluster().status.unwrap().external_secret_hash;
    assert_ne!(second, first);

    // Trailing whitespace only
    replace_payload(&h.store, &format!("{}\n", EXTERNAL_PAYLOAD)).await;
    h.pass().await.unwrap();
    assert_eq!(h.prober.calls(), 6);
    assert_ne!(h.cluster().status.unwrap().external_secret_hash, second);
}

#[tokio::test]
async fn changed_payload_is_dispatched_again() {
    let h = Harness::new(Platform::Aws, external_spec());
    h.store.insert(&external_secret(EXTERNAL_PAYLOAD)).unwrap();
    h.pass().await.unwrap();
    let before = h.cluster().status.unwrap().external_secret_hash;

    let changed = EXTERNAL_PAYLOAD.replace("replicapool", "fastpool");
    replace_payload(&h.store, &changed).await;
    h.pass().await.unwrap();

    assert_eq!(h.prober.calls(), 4);
    assert_ne!(h.cluster().status.unwrap().external_secret_hash, before);
    let block: StorageClass = h.store.peek("", "ocs-block").unwrap();
    assert_eq!(block.parameters.unwrap()["pool"], "fastpool");
}

#[tokio::test]
async fn missing_monitoring_port_aborts_before_any_write() {
    let h = Harness::new(Platform::Aws, external_spec());
    let payload = EXTERNAL_PAYLOAD.replace(r#", "MonitoringPort": "9283""#, "");
    h.store.insert(&external_secret(&payload)).unwrap();

    let err = h.pass().await.unwrap_err();
    assert_matches!(err, Error::MissingExternalKey { ref key, .. } if key == "MonitoringPort");
    assert_eq!(h.store.count(OpKind::Create, "ConfigMap"), 0);
    assert_eq!(h.prober.calls(), 0);

    let cluster = h.cluster();
    assert_eq!(cluster.phase(), Some(Phase::Error));
    let failed = cluster
        .conditions()
        .unwrap()
        .get(ConditionType::ReconcileComplete)
        .unwrap()
        .clone();
    assert!(failed.message.contains("MonitoringPort"));
    assert!(cluster.status.unwrap().external_secret_hash.is_none());
}

#[tokio::test]
async fn unreachable_endpoint_keeps_checksum_uncommitted() {
    let h = Harness::new(Platform::Aws, external_spec());
    h.store.insert(&external_secret(EXTERNAL_PAYLOAD)).unwrap();
    h.prober.unreachable.store(true, Ordering::SeqCst);

    assert_matches!(h.pass().await, Err(Error::EndpointUnreachable { .. }));
    assert!(h.store.peek::<ConfigMap>(NS, "mon-endpoints").is_none());
    assert!(h.cluster().status.unwrap().external_secret_hash.is_none());

    h.prober.unreachable.store(false, Ordering::SeqCst);
    h.pass().await.unwrap();
    assert!(h.store.peek::<ConfigMap>(NS, "mon-endpoints").is_some());
    assert!(h.cluster().status.unwrap().external_secret_hash.is_some());
}

#[tokio::test]
async fn missing_external_secret_is_an_error() {
    let h = Harness::new(Platform::Aws, external_spec());
    assert_matches!(h.pass().await, Err(Error::ExternalSecretMissing { .. }));
}
