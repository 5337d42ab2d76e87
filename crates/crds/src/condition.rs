//! Status condition types
//!
//! Conditions follow the Kubernetes convention: one entry per `type`,
//! replaced on update, with `lastTransitionTime` advancing only when the
//! status value actually changes.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type reported when the floating IP is allocated and in sync.
pub const CONDITION_READY: &str = "Ready";
/// Condition type reported while a provider operation is in flight.
pub const CONDITION_PROGRESSING: &str = "Progressing";
/// Condition type reported when reconciliation cannot make progress.
pub const CONDITION_DEGRADED: &str = "Degraded";

/// A single status condition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type (e.g. "Ready")
    #[serde(rename = "type")]
    pub type_: String,

    /// Condition status
    pub status: ConditionStatus,

    /// Machine-readable reason for the last transition
    pub reason: String,

    /// Human-readable detail
    pub message: String,

    /// Last time the condition status changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Generation observed when the condition was set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Condition status value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// The condition holds
    True,
    /// The condition does not hold
    False,
    /// The condition could not be evaluated
    Unknown,
}

impl Condition {
    /// Build a condition without a transition time; the status projector
    /// fills that in when merging against the existing condition list.
    #[must_use]
    pub fn new(
        type_: &str,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.to_string(),
            status,
            reason: reason.to_string(),
            message: message.into(),
            last_transition_time: None,
            observed_generation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_serde_camel_case() {
        let cond = Condition::new(CONDITION_READY, ConditionStatus::True, "Provisioned", "ok");
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["type"], "Ready");
        assert_eq!(json["status"], "True");
        assert!(json.get("lastTransitionTime").is_none());
    }
}
