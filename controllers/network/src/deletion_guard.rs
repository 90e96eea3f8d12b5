//! Network deletion guard
//!
//! A Network is protected by [`NETWORK_PROTECTION_FINALIZER`] while it is live.
//! Once deletion is requested the finalizer is released only after a consumer
//! lookup *succeeds* and returns no consumers. A failed lookup is treated as
//! "maybe in use": the finalizer stays and `DeletionBlocked` says why.
//!
//! Life cycle:
//!
//! ```text
//! Active ──delete──▶ DeletionRequested ──guard ran──▶ FinalizerPending
//!    │                                                    │
//!    └───────────── (no finalizer) ─────────▶ Deleted ◀───┘ lookup ok, zero consumers
//! ```

use crate::collaborators::{ConsumerLister, ConsumerRef, ObjectKey};
use crate::error::CollaboratorError;
use chrono::{DateTime, Utc};
use crds::{
    is_condition_true, network_reasons, set_condition, ConditionStatus, Network,
    NetworkCondition, NetworkConditionType, NETWORK_PROTECTION_FINALIZER,
};
use tracing::{debug, info, warn};

/// Where a Network is in the finalizer protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionState {
    /// Not being deleted
    Active,
    /// Deletion requested, guard has not evaluated yet
    DeletionRequested,
    /// Deletion requested, guard evaluated and is holding the finalizer
    FinalizerPending,
    /// Deletion requested and nothing holds the object any more
    Deleted,
}

/// Classify a Network from its metadata and conditions
pub fn deletion_state(network: &Network) -> DeletionState {
    if !network.is_being_deleted() {
        return DeletionState::Active;
    }
    if !network.has_protection_finalizer() {
        return DeletionState::Deleted;
    }
    if network
        .conditions()
        .iter()
        .any(|c| c.type_ == NetworkConditionType::DeletionBlocked)
    {
        DeletionState::FinalizerPending
    } else {
        DeletionState::DeletionRequested
    }
}

/// Add the protection finalizer. Returns `true` if the list changed.
pub fn add_finalizer(finalizers: &mut Vec<String>) -> bool {
    if finalizers.iter().any(|f| f == NETWORK_PROTECTION_FINALIZER) {
        return false;
    }
    finalizers.push(NETWORK_PROTECTION_FINALIZER.to_string());
    true
}

/// Remove every copy of the protection finalizer. Returns `true` if the list changed.
pub fn remove_finalizer(finalizers: &mut Vec<String>) -> bool {
    let before = finalizers.len();
    finalizers.retain(|f| f != NETWORK_PROTECTION_FINALIZER);
    finalizers.len() != before
}

/// What the caller must persist after a guard pass
#[derive(Debug, Clone, PartialEq)]
pub struct GuardDecision {
    /// State after this pass
    pub state: DeletionState,
    /// Finalizer list to persist
    pub finalizers: Vec<String>,
    /// Whether `finalizers` differs from the object's list
    pub finalizers_changed: bool,
    /// Full condition list to persist
    pub conditions: Vec<NetworkCondition>,
    /// Whether `conditions` differs from the object's status
    pub conditions_changed: bool,
    /// Consumers observed, empty when the lookup failed
    pub consumers: Vec<ConsumerRef>,
    /// The lookup failed and the pass should be retried
    pub lookup_failed: bool,
}

impl GuardDecision {
    fn unchanged(network: &Network, state: DeletionState) -> Self {
        Self {
            state,
            finalizers: network.metadata.finalizers.clone().unwrap_or_default(),
            finalizers_changed: false,
            conditions: network.conditions().to_vec(),
            conditions_changed: false,
            consumers: Vec::new(),
            lookup_failed: false,
        }
    }

    /// The protection finalizer is held and the Network cannot go away yet
    pub fn is_blocked(&self) -> bool {
        is_condition_true(&self.conditions, NetworkConditionType::DeletionBlocked)
    }
}

/// Decide the guard outcome for a Network given a consumer lookup result.
///
/// Pure: performs no I/O. Active Networks gain the finalizer; Networks under
/// deletion keep it unless `lookup` succeeded with zero consumers.
pub fn evaluate(
    network: &Network,
    lookup: Result<Vec<ConsumerRef>, &CollaboratorError>,
    now: DateTime<Utc>,
) -> GuardDecision {
    let state = deletion_state(network);
    let mut decision = GuardDecision::unchanged(network, state);

    match state {
        DeletionState::Deleted => decision,
        DeletionState::Active => {
            decision.finalizers_changed = add_finalizer(&mut decision.finalizers);
            decision
        }
        DeletionState::DeletionRequested | DeletionState::FinalizerPending => {
            let condition = match lookup {
                Err(e) => {
                    decision.lookup_failed = true;
                    NetworkCondition::new(
                        NetworkConditionType::DeletionBlocked,
                        ConditionStatus::True,
                        network_reasons::CONSUMER_LOOKUP_FAILED,
                        format!("unable to list consumers: {}", e),
                    )
                }
                Ok(consumers) if !consumers.is_empty() => {
                    let condition = NetworkCondition::new(
                        NetworkConditionType::DeletionBlocked,
                        ConditionStatus::True,
                        network_reasons::NETWORK_IN_USE,
                        format!("{} consumer(s) reference this network", consumers.len()),
                    );
                    decision.consumers = consumers;
                    condition
                }
                Ok(_) => {
                    decision.finalizers_changed = remove_finalizer(&mut decision.finalizers);
                    NetworkCondition::new(
                        NetworkConditionType::DeletionBlocked,
                        ConditionStatus::False,
                        network_reasons::NO_CONSUMERS,
                        "",
                    )
                }
            };

            decision.conditions_changed = set_condition(&mut decision.conditions, condition, now);
            decision.state = if decision.finalizers_changed {
                DeletionState::Deleted
            } else {
                DeletionState::FinalizerPending
            };
            decision
        }
    }
}

/// Run one guard pass, listing consumers only when deletion is in progress
pub async fn run_deletion_guard(
    network: &Network,
    lister: &dyn ConsumerLister,
    now: DateTime<Utc>,
) -> GuardDecision {
    let state = deletion_state(network);
    if matches!(state, DeletionState::Active | DeletionState::Deleted) {
        return evaluate(network, Ok(Vec::new()), now);
    }

    let key = ObjectKey::new(
        network.metadata.namespace.clone().unwrap_or_default(),
        network.metadata.name.clone().unwrap_or_default(),
    );

    match lister.list_consumers(&key).await {
        Ok(consumers) => {
            let decision = evaluate(network, Ok(consumers), now);
            if decision.finalizers_changed {
                info!("Network {} has no consumers, releasing finalizer", key);
            } else {
                debug!(
                    "Network {} still referenced by {} consumer(s)",
                    key,
                    decision.consumers.len()
                );
            }
            decision
        }
        Err(e) => {
            warn!("Consumer lookup for Network {} failed: {}", key, e);
            evaluate(network, Err(&e), now)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{at, consumer, create_test_network, deleting, StaticConsumerLister};
    use crds::get_condition;

    #[test]
    fn test_active_network_gains_finalizer_once() {
        let mut network = create_test_network("primary", "tenant-a", "vds-1");

        let decision = evaluate(&network, Ok(Vec::new()), at(0));
        assert_eq!(decision.state, DeletionState::Active);
        assert!(decision.finalizers_changed);
        assert_eq!(decision.finalizers, vec![NETWORK_PROTECTION_FINALIZER.to_string()]);

        network.metadata.finalizers = Some(decision.finalizers);
        let again = evaluate(&network, Ok(Vec::new()), at(1));
        assert!(!again.finalizers_changed);
        assert!(!again.conditions_changed);
    }

    #[test]
    fn test_deletion_state_classification() {
        let network = create_test_network("primary", "tenant-a", "vds-1");
        assert_eq!(deletion_state(&network), DeletionState::Active);

        let requested = deleting(network.clone(), true);
        assert_eq!(deletion_state(&requested), DeletionState::DeletionRequested);

        let decision = evaluate(&requested, Ok(vec![consumer("tenant-a", "nic-1")]), at(0));
        let mut pending = requested.clone();
        pending.status = Some(crds::NetworkStatus {
            conditions: decision.conditions,
        });
        assert_eq!(deletion_state(&pending), DeletionState::FinalizerPending);

        let released = deleting(network, false);
        assert_eq!(deletion_state(&released), DeletionState::Deleted);
    }

    #[test]
    fn test_consumers_block_deletion() {
        let network = deleting(create_test_network("primary", "tenant-a", "vds-1"), true);

        let decision = evaluate(
            &network,
            Ok(vec![consumer("tenant-a", "nic-1"), consumer("tenant-a", "nic-2")]),
            at(0),
        );

        assert_eq!(decision.state, DeletionState::FinalizerPending);
        assert!(!decision.finalizers_changed);
        assert!(decision.finalizers.iter().any(|f| f == NETWORK_PROTECTION_FINALIZER));
        let blocked = get_condition(&decision.conditions, NetworkConditionType::DeletionBlocked).unwrap();
        assert_eq!(blocked.status, ConditionStatus::True);
        assert_eq!(blocked.reason, network_reasons::NETWORK_IN_USE);
        assert_eq!(blocked.message, "2 consumer(s) reference this network");
        assert_eq!(blocked.last_transition_time, Some(at(0)));
        assert!(decision.is_blocked());
    }

    #[test]
    fn test_lookup_failure_keeps_finalizer() {
        let network = deleting(create_test_network("primary", "tenant-a", "vds-1"), true);
        let err = CollaboratorError::Unavailable("list timed out".to_string());

        let decision = evaluate(&network, Err(&err), at(0));

        assert!(decision.lookup_failed);
        assert!(!decision.finalizers_changed);
        assert!(decision.finalizers.iter().any(|f| f == NETWORK_PROTECTION_FINALIZER));
        let blocked = get_condition(&decision.conditions, NetworkConditionType::DeletionBlocked).unwrap();
        assert_eq!(blocked.status, ConditionStatus::True);
        assert_eq!(blocked.reason, network_reasons::CONSUMER_LOOKUP_FAILED);
    }

    #[test]
    fn test_zero_consumers_release_finalizer() {
        let mut network = deleting(create_test_network("primary", "tenant-a", "vds-1"), true);
        network
            .metadata
            .finalizers
            .as_mut()
            .unwrap()
            .push("other.example.com/keep".to_string());

        let decision = evaluate(&network, Ok(Vec::new()), at(0));

        assert_eq!(decision.state, DeletionState::Deleted);
        assert!(decision.finalizers_changed);
        assert_eq!(decision.finalizers, vec!["other.example.com/keep".to_string()]);
        let blocked = get_condition(&decision.conditions, NetworkConditionType::DeletionBlocked).unwrap();
        assert_eq!(blocked.status, ConditionStatus::False);
        assert_eq!(blocked.reason, network_reasons::NO_CONSUMERS);
        assert!(!decision.is_blocked());
    }

    #[test]
    fn test_finalizer_helpers_are_idempotent() {
        let mut finalizers = Vec::new();
        assert!(add_finalizer(&mut finalizers));
        assert!(!add_finalizer(&mut finalizers));
        assert_eq!(finalizers.len(), 1);
        assert!(remove_finalizer(&mut finalizers));
        assert!(!remove_finalizer(&mut finalizers));
        assert!(finalizers.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_passes_never_release_while_in_use() {
        let lister = StaticConsumerLister::new(vec![consumer("tenant-a", "nic-1")]);
        let mut network = deleting(create_test_network("primary", "tenant-a", "vds-1"), true);

        for step in 0..5 {
            if step == 2 {
                lister.set_failing(true);
            }
            if step == 3 {
                lister.set_failing(false);
            }
            let decision = run_deletion_guard(&network, &lister, at(step)).await;
            assert!(!decision.finalizers_changed, "released at step {step}");
            network.status = Some(crds::NetworkStatus {
                conditions: decision.conditions,
            });
        }

        let blocked = get_condition(network.conditions(), NetworkConditionType::DeletionBlocked).unwrap();
        assert_eq!(blocked.reason, network_reasons::NETWORK_IN_USE);
        assert_eq!(blocked.last_transition_time, Some(at(0)));

        lister.set_consumers(Vec::new());
        let decision = run_deletion_guard(&network, &lister, at(10)).await;
        assert!(decision.finalizers_changed);
        assert_eq!(decision.state, DeletionState::Deleted);
    }

    #[tokio::test]
    async fn test_active_network_skips_lookup() {
        let lister = StaticConsumerLister::new(Vec::new());
        lister.set_failing(true);
        let network = create_test_network("primary", "tenant-a", "vds-1");

        let decision = run_deletion_guard(&network, &lister, at(0)).await;

        assert!(!decision.lookup_failed);
        assert_eq!(lister.calls(), 0);
    }
}
