//! StorageCluster Operator - Reconciliation Engine
//!
//! A Kubernetes operator converging a `StorageCluster` into the storage
//! engine's resources: the engine cluster, block pools, filesystems, object
//! stores and the storage classes applications provision from. In external
//! mode the same engine connects to an existing cluster described by a secret.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │            Controller (kube-runtime watch + requeue policy)          │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                        Reconcile Orchestrator                        │
//! │  topology → external → engine cluster → block pools → filesystems    │
//! │           → object stores → storage classes → status                 │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌────────────────────┐  │
//! │  │  ResourceStore   │  │ EndpointProber   │  │ Readiness/Metrics  │  │
//! │  │ (kube | memory)  │  │     (TCP)        │  │  (axum server)     │  │
//! │  └──────────────────┘  └──────────────────┘  └────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controlplane`]: Orchestrator, ensurers, external-secret synthesizer, adapters
//! - [`crd`]: Custom Resource Definitions
//! - [`domain`]: Conditions, phases and ports
//! - [`error`]: Error types and requeue policy
//! - [`metrics`]: Prometheus reconcile metrics
//! - [`server`]: Health, readiness and metrics endpoints

pub mod controlplane;
pub mod crd;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod server;

// Re-export commonly used types
pub use controlplane::{
    KubeStore, MemoryStore, Readiness, Reconciler, ReconcilerConfig, TcpProber,
};

pub use crd::{
    BlockPool, EngineCluster, Filesystem, ObjectStore, StorageCluster, StorageClusterSpec,
    StorageClusterStatus,
};

pub use domain::conditions::{Condition, ConditionStatus, ConditionType, Conditions, Phase};
pub use domain::ports::{EndpointProber, ManagedResource, Platform, ResourceStore};

pub use error::{Error, ErrorAction, Result};

pub use metrics::ReconcileMetrics;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
