//! Status condition projection
//!
//! Pure functions that derive the user-facing condition list from the
//! reconciler's view of a resource. Merging is by condition type:
//! a desired condition replaces the existing entry of the same type and
//! leaves unrelated entries alone. `lastTransitionTime` only advances when
//! the condition's status value actually changed, so repeated identical
//! writes do not churn timestamps.

use chrono::{DateTime, Utc};
use crds::{
    Condition, ConditionStatus, CONDITION_DEGRADED, CONDITION_PROGRESSING, CONDITION_READY,
};

/// The floating IP was allocated by this reconcile pass.
pub(crate) const REASON_PROVISIONED: &str = "Provisioned";
/// The provider-side record matches the spec.
pub(crate) const REASON_IN_SYNC: &str = "InSync";
/// An existing provider-side floating IP was adopted at startup.
pub(crate) const REASON_ADOPTED: &str = "Adopted";
/// The spec was rejected by validation or by the provider.
pub(crate) const REASON_INVALID_SPEC: &str = "InvalidSpec";
/// An immutable spec field was changed after creation.
pub(crate) const REASON_IMMUTABLE_FIELD_CHANGED: &str = "ImmutableFieldChanged";
/// A recorded provider ID no longer resolves to a provider-side record.
pub(crate) const REASON_PROVIDER_RESOURCE_MISSING: &str = "ProviderResourceMissing";
/// The transient-error retry budget was exhausted.
pub(crate) const REASON_RETRIES_EXHAUSTED: &str = "RetriesExhausted";
/// Create call in flight.
pub(crate) const REASON_PROVISIONING: &str = "Provisioning";
/// Mutable-field update in flight.
pub(crate) const REASON_UPDATING: &str = "Updating";
/// Provider-side cleanup in flight.
pub(crate) const REASON_DELETING: &str = "Deleting";
/// Cleanup failed in a way retries cannot fix.
pub(crate) const REASON_CLEANUP_FAILED: &str = "CleanupFailed";
/// The resource recovered after a degraded period.
pub(crate) const REASON_RECOVERED: &str = "Recovered";

/// Build a `Ready` condition.
pub(crate) fn ready(status: bool, reason: &str, message: impl Into<String>) -> Condition {
    let status = if status {
        ConditionStatus::True
    } else {
        ConditionStatus::False
    };
    Condition::new(CONDITION_READY, status, reason, message)
}

/// Build a `Progressing` condition.
pub(crate) fn progressing(reason: &str, message: impl Into<String>) -> Condition {
    Condition::new(CONDITION_PROGRESSING, ConditionStatus::True, reason, message)
}

/// Build a `Progressing=False` condition marking the operation settled.
pub(crate) fn progressing_done(reason: &str, message: impl Into<String>) -> Condition {
    Condition::new(CONDITION_PROGRESSING, ConditionStatus::False, reason, message)
}

/// Build a `Degraded=True` condition.
pub(crate) fn degraded(reason: &str, message: impl Into<String>) -> Condition {
    Condition::new(CONDITION_DEGRADED, ConditionStatus::True, reason, message)
}

/// Build a `Degraded=False` condition.
pub(crate) fn degraded_cleared(reason: &str, message: impl Into<String>) -> Condition {
    Condition::new(CONDITION_DEGRADED, ConditionStatus::False, reason, message)
}

/// Merge desired conditions into the current condition list.
///
/// Entries are matched by type; unmatched current entries are preserved.
/// The result is ordered by type so that repeated projections of the same
/// state compare equal.
pub(crate) fn merge_conditions(
    current: &[Condition],
    desired: Vec<Condition>,
    now: DateTime<Utc>,
    observed_generation: Option<i64>,
) -> Vec<Condition> {
    let mut merged: Vec<Condition> = current
        .iter()
        .filter(|c| !desired.iter().any(|d| d.type_ == c.type_))
        .cloned()
        .collect();

    for mut cond in desired {
        let previous = current.iter().find(|c| c.type_ == cond.type_);
        cond.last_transition_time = match previous {
            Some(existing) if existing.status == cond.status => {
                existing.last_transition_time.or(Some(now))
            }
            _ => Some(now),
        };
        cond.observed_generation = observed_generation;
        merged.push(cond);
    }

    merged.sort_by(|a, b| a.type_.cmp(&b.type_));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_merge_replaces_matching_type() {
        let t0 = at(1_000);
        let current = merge_conditions(&[], vec![ready(true, "Provisioned", "ok")], t0, Some(1));
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].last_transition_time, Some(t0));

        let t1 = at(2_000);
        let merged = merge_conditions(
            &current,
            vec![ready(false, "ImmutableFieldChanged", "location changed")],
            t1,
            Some(2),
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].reason, "ImmutableFieldChanged");
        assert_eq!(merged[0].observed_generation, Some(2));
    }

    #[test]
    fn test_merge_preserves_unrelated_entries() {
        let t0 = at(1_000);
        let current = merge_conditions(
            &[],
            vec![ready(true, "Provisioned", "ok"), degraded("RetriesExhausted", "gave up")],
            t0,
            Some(1),
        );

        let merged = merge_conditions(
            &current,
            vec![ready(true, "InSync", "in sync")],
            at(2_000),
            Some(1),
        );
        assert_eq!(merged.len(), 2);
        let degraded_cond = merged.iter().find(|c| c.type_ == CONDITION_DEGRADED).unwrap();
        assert_eq!(degraded_cond.reason, "RetriesExhausted");
        assert_eq!(degraded_cond.last_transition_time, Some(t0));
    }

    #[test]
    fn test_transition_time_kept_when_status_unchanged() {
        let t0 = at(1_000);
        let current = merge_conditions(&[], vec![ready(true, "Provisioned", "ok")], t0, Some(1));

        // Same status, different reason: timestamp must not move.
        let merged = merge_conditions(
            &current,
            vec![ready(true, "InSync", "verified against provider")],
            at(5_000),
            Some(1),
        );
        assert_eq!(merged[0].last_transition_time, Some(t0));
        assert_eq!(merged[0].reason, "InSync");
    }

    #[test]
    fn test_transition_time_advances_on_status_flip() {
        let t0 = at(1_000);
        let current = merge_conditions(&[], vec![ready(true, "Provisioned", "ok")], t0, Some(1));

        let t1 = at(5_000);
        let merged = merge_conditions(
            &current,
            vec![ready(false, "ProviderResourceMissing", "gone")],
            t1,
            Some(1),
        );
        assert_eq!(merged[0].last_transition_time, Some(t1));
    }

    #[test]
    fn test_identical_projection_compares_equal() {
        let t0 = at(1_000);
        let current = merge_conditions(
            &[],
            vec![ready(true, "Provisioned", "ok"), progressing("Provisioning", "creating")],
            t0,
            Some(1),
        );
        let again = merge_conditions(
            &current,
            vec![ready(true, "Provisioned", "ok"), progressing("Provisioning", "creating")],
            at(9_000),
            Some(1),
        );
        assert_eq!(current, again);
    }
}
