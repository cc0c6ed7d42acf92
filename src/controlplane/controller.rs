//! Dispatcher wiring
//!
//! Hooks the [`Reconciler`] into a kube-runtime `Controller` that watches
//! StorageClusters and the engine kinds they own. Requeue timing lives here,
//! derived from [`Error::action`]; the reconciler itself never retries.

use crate::controlplane::orchestrator::Reconciler;
use crate::controlplane::store::KubeStore;
use crate::crd::{BlockPool, EngineCluster, Filesystem, ObjectStore, StorageCluster};
use crate::domain::ports::ManagedResource;
use crate::error::{Error, ErrorAction};
use futures::StreamExt;
use kube::runtime::controller::{self, Action};
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, ResourceExt};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Resync interval after a successful pass
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(300);
const BACKOFF_BASE: Duration = Duration::from_secs(5);
const BACKOFF_MAX: Duration = Duration::from_secs(300);

/// Shared state of the controller loop
pub struct Context {
    pub reconciler: Reconciler<KubeStore>,
    failures: FailureCounts,
}

impl Context {
    pub fn new(reconciler: Reconciler<KubeStore>) -> Self {
        Self {
            reconciler,
            failures: FailureCounts::default(),
        }
    }
}

/// Consecutive failures per `namespace/name`
#[derive(Debug, Default)]
pub struct FailureCounts {
    counts: Mutex<BTreeMap<String, u32>>,
}

impl FailureCounts {
    /// Exponential delay for the nth consecutive failure of a key
    pub fn backoff(&self, key: &str) -> Duration {
        let mut counts = self.counts.lock();
        let attempt = counts.entry(key.to_string()).or_insert(0);
        let delay = backoff_delay(*attempt);
        *attempt = attempt.saturating_add(1);
        delay
    }

    /// Drop the key after a success or once the cluster is gone
    pub fn reset(&self, key: &str) {
        self.counts.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.counts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_BASE
        .saturating_mul(2u32.saturating_pow(attempt.min(16)))
        .min(BACKOFF_MAX)
}

fn key(namespace: Option<&str>, name: &str) -> String {
    format!("{}/{}", namespace.unwrap_or("default"), name)
}

fn key_of(cluster: &StorageCluster) -> String {
    key(Some(&cluster.namespace_or_default()), &cluster.name_any())
}

async fn reconcile(cluster: Arc<StorageCluster>, ctx: Arc<Context>) -> Result<Action, Error> {
    ctx.reconciler
        .reconcile(&cluster.namespace_or_default(), &cluster.name_any())
        .await?;
    // Also covers a cluster that vanished or finished finalizing
    ctx.failures.reset(&key_of(&cluster));
    Ok(Action::requeue(RESYNC_INTERVAL))
}

fn error_policy(cluster: Arc<StorageCluster>, err: &Error, ctx: Arc<Context>) -> Action {
    let key = key_of(&cluster);
    match err.action() {
        ErrorAction::RequeueAfter(delay) => {
            info!(%key, error = %err, ?delay, "Waiting on a dependency");
            Action::requeue(delay)
        }
        ErrorAction::RequeueWithBackoff => {
            let delay = ctx.failures.backoff(&key);
            warn!(%key, error = %err, ?delay, "Reconcile failed, backing off");
            Action::requeue(delay)
        }
        ErrorAction::NoRequeue => {
            error!(%key, error = %err, "Reconcile failed permanently");
            Action::await_change()
        }
    }
}

fn api<K: ManagedResource>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Watch StorageClusters (in one namespace or all) until shutdown
pub async fn run(client: Client, namespace: Option<String>, ctx: Arc<Context>) {
    let ns = namespace.as_deref();
    let clusters = api::<StorageCluster>(&client, ns);
    let config = watcher::Config::default();

    info!(namespace = ns.unwrap_or("*"), "Starting StorageCluster controller");
    let tracked = ctx.clone();
    Controller::new(clusters, config.clone())
        .owns(api::<EngineCluster>(&client, ns), config.clone())
        .owns(api::<BlockPool>(&client, ns), config.clone())
        .owns(api::<Filesystem>(&client, ns), config.clone())
        .owns(api::<ObjectStore>(&client, ns), config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            match result {
                Ok(_) => {}
                // Deleted while a retry was scheduled
                Err(controller::Error::ObjectNotFound(obj)) => {
                    debug!(name = %obj.name, "StorageCluster gone, forgetting failures");
                    tracked
                        .failures
                        .reset(&key(obj.namespace.as_deref(), &obj.name));
                }
                Err(e) => warn!(error = %e, "Controller event failed"),
            }
            std::future::ready(())
        })
        .await;
    info!("Controller stopped");
}
