//! Condition ledger
//!
//! Status conditions are kept as an ordered list with at most one live entry per
//! condition type. Updating a condition only stamps a new `lastTransitionTime`
//! when its status flips, so repeated reconciles with fresh messages do not churn
//! the timestamp.
//!
//! All functions take `now` explicitly and never read a clock.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition status following Kubernetes conventions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum ConditionStatus {
    /// Condition holds
    True,
    /// Condition does not hold
    False,
    /// Condition could not be determined
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Common view over the per-resource condition structs
///
/// `Network` and `VSphereDistributedNetwork` carry different condition types on the
/// wire; this trait lets the ledger operate on both.
pub trait StatusCondition: Clone {
    /// Type discriminator of the condition
    type Kind: Clone + PartialEq + std::fmt::Debug;

    /// Condition type
    fn kind(&self) -> &Self::Kind;
    /// True, False or Unknown
    fn status(&self) -> ConditionStatus;
    /// Machine-readable reason, empty when unset
    fn reason(&self) -> &str;
    /// Human-readable details, empty when unset
    fn message(&self) -> &str;
    /// Time of the last status change, if stamped
    fn last_transition_time(&self) -> Option<DateTime<Utc>>;
    /// Stamp the time of the last status change
    fn set_last_transition_time(&mut self, at: DateTime<Utc>);
}

/// Find the live condition of the given type
pub fn get_condition<C: StatusCondition>(conditions: &[C], kind: C::Kind) -> Option<&C> {
    conditions.iter().find(|c| *c.kind() == kind)
}

/// Whether a condition of the given type exists with status `True`
pub fn is_condition_true<C: StatusCondition>(conditions: &[C], kind: C::Kind) -> bool {
    get_condition(conditions, kind).is_some_and(|c| c.status() == ConditionStatus::True)
}

/// Insert or update a condition.
///
/// Entries of other types, including ones this controller does not manage, are
/// left as they are.
///
/// - absent: appended with `lastTransitionTime = now`
/// - present with a different status: replaced, `lastTransitionTime = now`
/// - present with the same status: reason and message updated, transition time kept
///
/// Stale duplicates of the same type are dropped so only one entry stays live.
/// Returns `true` when the list changed.
pub fn set_condition<C: StatusCondition>(
    conditions: &mut Vec<C>,
    mut new_condition: C,
    now: DateTime<Utc>,
) -> bool {
    let kind = new_condition.kind().clone();
    let before = conditions.len();
    let mut seen = false;
    conditions.retain(|c| {
        if *c.kind() != kind {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });
    let mut changed = conditions.len() != before;

    match conditions.iter_mut().find(|c| *c.kind() == kind) {
        Some(existing) => {
            if existing.status() == new_condition.status() {
                let transition = existing.last_transition_time().unwrap_or(now);
                new_condition.set_last_transition_time(transition);
            } else {
                new_condition.set_last_transition_time(now);
            }
            if !same_condition(existing, &new_condition) {
                *existing = new_condition;
                changed = true;
            }
        }
        None => {
            new_condition.set_last_transition_time(now);
            conditions.push(new_condition);
            changed = true;
        }
    }

    changed
}

/// Remove every condition of the given type. Returns `true` if any was removed.
pub fn remove_condition<C: StatusCondition>(conditions: &mut Vec<C>, kind: C::Kind) -> bool {
    let before = conditions.len();
    conditions.retain(|c| *c.kind() != kind);
    conditions.len() != before
}

fn same_condition<C: StatusCondition>(a: &C, b: &C) -> bool {
    a.status() == b.status()
        && a.reason() == b.reason()
        && a.message() == b.message()
        && a.last_transition_time() == b.last_transition_time()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{NetworkCondition, NetworkConditionType};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn blocked(status: ConditionStatus, message: &str) -> NetworkCondition {
        NetworkCondition::new(NetworkConditionType::DeletionBlocked, status, "NetworkInUse", message)
    }

    #[test]
    fn test_set_condition_appends_when_absent() {
        let mut conditions = Vec::new();
        assert!(set_condition(&mut conditions, blocked(ConditionStatus::True, "1"), at(0)));

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time, Some(at(0)));
    }

    #[test]
    fn test_same_status_keeps_transition_time() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, blocked(ConditionStatus::True, "1 consumer(s)"), at(0));
        let changed = set_condition(
            &mut conditions,
            blocked(ConditionStatus::True, "2 consumer(s)"),
            at(30),
        );

        assert!(changed, "message change is still a change");
        assert_eq!(conditions[0].message, "2 consumer(s)");
        assert_eq!(conditions[0].last_transition_time, Some(at(0)));
    }

    #[test]
    fn test_status_flip_stamps_now() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, blocked(ConditionStatus::True, "x"), at(0));
        set_condition(&mut conditions, blocked(ConditionStatus::False, "x"), at(45));

        assert_eq!(conditions[0].status, ConditionStatus::False);
        assert_eq!(conditions[0].last_transition_time, Some(at(45)));
    }

    #[test]
    fn test_identical_condition_is_idempotent() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, blocked(ConditionStatus::True, "x"), at(0));
        let snapshot = conditions.clone();

        assert!(!set_condition(&mut conditions, blocked(ConditionStatus::True, "x"), at(60)));
        assert!(!set_condition(&mut conditions, blocked(ConditionStatus::True, "x"), at(120)));
        assert_eq!(conditions, snapshot);
    }

    #[test]
    fn test_duplicates_collapse_to_one() {
        let mut conditions = vec![
            blocked(ConditionStatus::True, "old"),
            NetworkCondition::new(
                NetworkConditionType::ProviderResolved,
                ConditionStatus::True,
                "ProviderFound",
                "",
            ),
            blocked(ConditionStatus::False, "stale"),
        ];
        conditions[0].last_transition_time = Some(at(0));

        set_condition(&mut conditions, blocked(ConditionStatus::True, "new"), at(10));

        let live: Vec<_> = conditions
            .iter()
            .filter(|c| c.type_ == NetworkConditionType::DeletionBlocked)
            .collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].message, "new");
        assert_eq!(live[0].last_transition_time, Some(at(0)));
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn test_foreign_condition_types_are_left_alone() {
        let mut conditions: Vec<NetworkCondition> = serde_json::from_value(serde_json::json!([
            { "type": "Ready", "status": "True", "reason": "External" }
        ]))
        .unwrap();

        assert!(set_condition(&mut conditions, blocked(ConditionStatus::True, "x"), at(0)));
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].type_, NetworkConditionType::Other("Ready".to_string()));
        assert_eq!(conditions[0].reason, "External");
        assert_eq!(conditions[0].last_transition_time, None);

        let json = serde_json::to_value(&conditions).unwrap();
        assert_eq!(json[0]["type"], "Ready");
        assert_eq!(json[1]["type"], "DeletionBlocked");
    }

    #[test]
    fn test_get_and_remove_condition() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, blocked(ConditionStatus::True, "x"), at(0));

        assert!(is_condition_true(&conditions, NetworkConditionType::DeletionBlocked));
        assert!(get_condition(&conditions, NetworkConditionType::ProviderResolved).is_none());

        assert!(remove_condition(&mut conditions, NetworkConditionType::DeletionBlocked));
        assert!(!remove_condition(&mut conditions, NetworkConditionType::DeletionBlocked));
        assert!(conditions.is_empty());
    }
}
