//! Reconciliation Control Plane
//!
//! The engine converging a StorageCluster's dependent objects: the
//! orchestrator and its pipeline of ensurers, the external-secret
//! synthesizer, store and probe adapters, and the kube-runtime wiring.

pub mod config;
pub mod controller;
pub mod ensurers;
pub mod external;
pub mod orchestrator;
pub mod pass;
pub mod probe;
pub mod readiness;
pub mod store;

pub use config::{EngineDefaults, PlacementDefaults, ReconcilerConfig};
pub use orchestrator::{Reconciler, Step, PIPELINE};
pub use pass::Pass;
pub use probe::TcpProber;
pub use readiness::Readiness;
pub use store::{KubeStore, MemoryStore};
