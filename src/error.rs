//! Error types for the StorageCluster operator
//!
//! Provides structured error types for the reconciliation engine, the
//! dependent-object store adapters and the external-secret synthesizer.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the operator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes / Store Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Resource already exists: {kind}/{name}")]
    ResourceExists { kind: String, name: String },

    #[error("Write conflict on {kind}/{name}: object was modified concurrently")]
    Conflict { kind: String, name: String },

    #[error("{kind} {name:?} is marked for deletion and cannot be restored")]
    MarkedForDeletion { kind: String, name: String },

    // =========================================================================
    // Dependency Errors
    // =========================================================================
    #[error("{kind} {name:?} is not ready: {reason}")]
    DependencyNotReady {
        kind: String,
        name: String,
        reason: String,
    },

    // =========================================================================
    // External Cluster Errors
    // =========================================================================
    #[error("External cluster secret {name:?} not found")]
    ExternalSecretMissing { name: String },

    #[error("External cluster secret is malformed: {0}")]
    ExternalSecretMalformed(String),

    #[error("{key} not present in the {record} record of the external cluster secret")]
    MissingExternalKey { record: String, key: String },

    #[error("Invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Endpoint {endpoint} is not reachable: {reason}")]
    EndpointUnreachable { endpoint: String, reason: String },

    #[error("Unknown storage class record {name:?} in the external cluster secret")]
    UnknownStorageClassRecord { name: String },

    // =========================================================================
    // Parse / Encoding Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Metrics registration error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action the dispatcher should take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Dependencies converge on their own; poll again shortly
            Error::DependencyNotReady { .. } => ErrorAction::RequeueAfter(Duration::from_secs(10)),

            // Deletion in progress elsewhere - wait for it to finish
            Error::MarkedForDeletion { .. } => ErrorAction::RequeueAfter(Duration::from_secs(30)),

            // An invalid spec stays invalid until the object is edited
            Error::Configuration(_) => ErrorAction::NoRequeue,

            // Structural and transient failures alike are retried identically
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// True when the error reports an absent object
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::ResourceNotFound { .. } => true,
            Error::Kube(kube::Error::Api(response)) => response.code == 404,
            _ => false,
        }
    }
}

/// Result type alias for the operator
pub type Result<T> = std::result::Result<T, Error>;
