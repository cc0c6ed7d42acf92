//! Custom Resource Definitions
//!
//! This module contains all CRD types:
//! - StorageCluster: top-level desired/observed state
//! - StorageClusterInitialization: one-time initialization marker
//! - EngineCluster, BlockPool, Filesystem, ObjectStore: the storage engine's kinds

pub mod common;
pub mod engine_cluster;
pub mod object_store;
pub mod pools;
pub mod storage_cluster;

pub use common::*;
pub use engine_cluster::*;
pub use object_store::*;
pub use pools::*;
pub use storage_cluster::*;
