//! Condition and Phase model for StorageCluster status
//!
//! Conditions are keyed by type. Setting a condition replaces reason and
//! message in place; the transition time only moves when the status value
//! changes.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Reasons and Messages
// =============================================================================

pub const REASON_RECONCILE_INIT: &str = "Init";
pub const REASON_RECONCILE_FAILED: &str = "ReconcileFailed";
pub const REASON_RECONCILE_COMPLETED: &str = "ReconcileCompleted";
pub const MESSAGE_RECONCILE_INIT: &str = "Initializing StorageCluster";
pub const MESSAGE_RECONCILE_COMPLETED: &str = "Reconcile completed successfully";

// =============================================================================
// Condition Types
// =============================================================================

/// Type of a status condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ConditionType {
    Available,
    Progressing,
    Degraded,
    Upgradeable,
    ReconcileComplete,
    ExternalClusterConnected,
    ExternalClusterConnecting,
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConditionType::Available => "Available",
            ConditionType::Progressing => "Progressing",
            ConditionType::Degraded => "Degraded",
            ConditionType::Upgradeable => "Upgradeable",
            ConditionType::ReconcileComplete => "ReconcileComplete",
            ConditionType::ExternalClusterConnected => "ExternalClusterConnected",
            ConditionType::ExternalClusterConnecting => "ExternalClusterConnecting",
        };
        f.write_str(s)
    }
}

/// Condition status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A typed, timestamped health signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: ConditionType,
    /// Status: True, False, Unknown
    pub status: ConditionStatus,
    /// Machine-readable reason
    #[serde(default)]
    pub reason: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Last time the status value changed
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    /// Build a condition without a transition time; it is stamped on merge
    pub fn new(
        r#type: ConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            r#type,
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: None,
        }
    }
}

// =============================================================================
// Condition Set
// =============================================================================

/// Ordered list of conditions, at most one per type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a condition, stamping the transition time with the current time
    pub fn set(&mut self, condition: Condition) {
        self.set_at(condition, Utc::now());
    }

    /// Set a condition, replacing reason/message of an existing one of the
    /// same type. The transition time changes only when the status changes.
    pub fn set_at(&mut self, condition: Condition, now: DateTime<Utc>) {
        match self.0.iter_mut().find(|c| c.r#type == condition.r#type) {
            Some(existing) => {
                if existing.status != condition.status {
                    existing.status = condition.status;
                    existing.last_transition_time = Some(now);
                }
                existing.reason = condition.reason;
                existing.message = condition.message;
            }
            None => {
                let mut condition = condition;
                condition.last_transition_time = Some(now);
                self.0.push(condition);
            }
        }
    }

    /// Fold every condition of `other` into this set, in order
    pub fn merge(&mut self, other: &Conditions) {
        let now = Utc::now();
        for condition in other.iter() {
            self.set_at(condition.clone(), now);
        }
    }

    pub fn get(&self, r#type: ConditionType) -> Option<&Condition> {
        self.0.iter().find(|c| c.r#type == r#type)
    }

    pub fn is_true(&self, r#type: ConditionType) -> bool {
        self.get(r#type)
            .map_or(false, |c| c.status == ConditionStatus::True)
    }

    pub fn is_false(&self, r#type: ConditionType) -> bool {
        self.get(r#type)
            .map_or(false, |c| c.status == ConditionStatus::False)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    // -------------------------------------------------------------------------
    // Canned transitions
    // -------------------------------------------------------------------------

    /// First-seen object: reconcile is starting
    pub fn set_progressing(&mut self, reason: &str, message: &str) {
        use ConditionStatus::*;
        self.set(Condition::new(ConditionType::Progressing, True, reason, message));
        self.set(Condition::new(ConditionType::Available, False, reason, message));
        self.set(Condition::new(ConditionType::Degraded, False, reason, message));
        self.set(Condition::new(ConditionType::Upgradeable, False, reason, message));
    }

    /// Every component reported healthy
    pub fn set_complete(&mut self, reason: &str, message: &str) {
        use ConditionStatus::*;
        self.set(Condition::new(ConditionType::ReconcileComplete, True, reason, message));
        self.set(Condition::new(ConditionType::Available, True, reason, message));
        self.set(Condition::new(ConditionType::Progressing, False, reason, message));
        self.set(Condition::new(ConditionType::Degraded, False, reason, message));
        self.set(Condition::new(ConditionType::Upgradeable, True, reason, message));
    }

    /// The pass aborted
    pub fn set_error(&mut self, reason: &str, message: &str) {
        self.set(Condition::new(
            ConditionType::ReconcileComplete,
            ConditionStatus::False,
            reason,
            message,
        ));
    }
}

impl<'a> IntoIterator for &'a Conditions {
    type Item = &'a Condition;
    type IntoIter = std::slice::Iter<'a, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Phase
// =============================================================================

/// Lifecycle phase of the StorageCluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Phase {
    Progressing,
    Ready,
    #[serde(rename = "Not Ready")]
    NotReady,
    Expanding,
    Deleting,
    Error,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Progressing => write!(f, "Progressing"),
            Phase::Ready => write!(f, "Ready"),
            Phase::NotReady => write!(f, "Not Ready"),
            Phase::Expanding => write!(f, "Expanding"),
            Phase::Deleting => write!(f, "Deleting"),
            Phase::Error => write!(f, "Error"),
        }
    }
}
