//! Network reconciliation.
//!
//! Protects live Networks with the finalizer, reports whether `providerRef`
//! resolves, and drives the deletion guard once deletion is requested.

use super::{resource_key, Reconciler};
use crate::collaborators::ObjectKey;
use crate::deletion_guard::{run_deletion_guard, DeletionState};
use crate::error::ControllerError;
use crate::resolver::{ResolveError, ResolvedObject};
use chrono::{DateTime, Utc};
use crds::{
    network_reasons, set_condition, ConditionStatus, Network, NetworkCondition,
    NetworkConditionType, NetworkProviderReference, NetworkStatus,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// `ProviderResolved` condition for a resolution result
pub fn provider_condition(
    reference: &NetworkProviderReference,
    resolution: &Result<ResolvedObject, ResolveError>,
) -> NetworkCondition {
    let (status, reason, message) = match resolution {
        Ok(_) => (
            ConditionStatus::True,
            network_reasons::PROVIDER_FOUND,
            String::new(),
        ),
        Err(ResolveError::NotFound(_)) => (
            ConditionStatus::False,
            network_reasons::PROVIDER_NOT_FOUND,
            format!("provider {} does not exist", reference),
        ),
        Err(e @ (ResolveError::UnsupportedKind { .. } | ResolveError::UnsupportedVersion { .. })) => (
            ConditionStatus::False,
            network_reasons::UNSUPPORTED_PROVIDER,
            e.to_string(),
        ),
        Err(e) => (
            ConditionStatus::Unknown,
            network_reasons::PROVIDER_LOOKUP_FAILED,
            e.to_string(),
        ),
    };
    NetworkCondition::new(NetworkConditionType::ProviderResolved, status, reason, message)
}

fn network_key(network: &Network) -> Result<ObjectKey, ControllerError> {
    let name = network
        .metadata
        .name
        .clone()
        .ok_or_else(|| ControllerError::InvalidResource("Network missing name".to_string()))?;
    let namespace = network.metadata.namespace.clone().ok_or_else(|| {
        ControllerError::InvalidResource(format!("Network {} missing namespace", name))
    })?;
    Ok(ObjectKey::new(namespace, name))
}

impl Reconciler {
    /// Reconcile one Network.
    ///
    /// Returns the delay after which the pass should be retried, or `None`
    /// when the Network is settled until its next change.
    pub async fn reconcile_network(
        &self,
        network: &Network,
        now: DateTime<Utc>,
    ) -> Result<Option<Duration>, ControllerError> {
        let key = network_key(network)?;
        let backoff_key = resource_key("Network", Some(&key.namespace), &key.name);

        let decision = run_deletion_guard(network, self.consumers.as_ref(), now).await;
        if decision.state == DeletionState::Deleted && !decision.finalizers_changed {
            debug!("Network {} is being deleted and holds no finalizer", key);
            self.reset_error(&backoff_key);
            return Ok(None);
        }

        if decision.is_blocked() {
            info!("Deletion of Network {} is blocked", key);
        }

        let mut conditions = decision.conditions.clone();
        let mut conditions_changed = decision.conditions_changed;
        let mut needs_retry = decision.lookup_failed;

        if decision.state == DeletionState::Active {
            if decision.finalizers_changed {
                info!("Adding protection finalizer to Network {}", key);
                let result = self
                    .writer
                    .write_network_finalizers(&key, &decision.finalizers)
                    .await;
                if !self.written(&backoff_key, result)? {
                    return Ok(None);
                }
            }

            let reference = &network.spec.provider_ref;
            let resolution = self.resolver.resolve_provider(reference).await;
            match &resolution {
                Ok(_) => debug!("Network {} provider {} resolved", key, reference),
                Err(e) if e.is_transient() => {
                    warn!("Network {} provider lookup failed: {}", key, e);
                    needs_retry = true;
                }
                Err(e) => info!("Network {} provider unresolved: {}", key, e),
            }
            conditions_changed |=
                set_condition(&mut conditions, provider_condition(reference, &resolution), now);
        }

        // Status goes out before the finalizer is released; the object may vanish right after.
        if conditions_changed {
            info!("Updating conditions of Network {}", key);
            let result = self
                .writer
                .write_network_status(&key, &NetworkStatus { conditions })
                .await;
            if !self.written(&backoff_key, result)? {
                return Ok(None);
            }
        }

        if decision.state == DeletionState::Deleted && decision.finalizers_changed {
            info!("Releasing protection finalizer of Network {}", key);
            let result = self
                .writer
                .write_network_finalizers(&key, &decision.finalizers)
                .await;
            if !self.written(&backoff_key, result)? {
                return Ok(None);
            }
        }

        Ok(self.settle(&backoff_key, needs_retry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        at, consumer, create_test_network, create_test_reconciler, create_test_vds, deleting,
        WriteEvent,
    };
    use crds::{get_condition, NETWORK_PROTECTION_FINALIZER};

    #[tokio::test]
    async fn test_dangling_provider_is_reported_not_fatal() {
        let harness = create_test_reconciler();
        let network = create_test_network("primary", "tenant-a", "vds-missing");

        let retry = harness
            .reconciler
            .reconcile_network(&network, at(0))
            .await
            .unwrap();

        assert_eq!(retry, None);
        let status = harness.writer.last_network_status().unwrap();
        let resolved = get_condition(&status.conditions, NetworkConditionType::ProviderResolved).unwrap();
        assert_eq!(resolved.status, ConditionStatus::False);
        assert_eq!(resolved.reason, network_reasons::PROVIDER_NOT_FOUND);
        assert!(resolved.message.contains("vds-missing"));
    }

    #[tokio::test]
    async fn test_active_network_gets_finalizer_and_resolves_provider() {
        let harness = create_test_reconciler();
        harness.store.insert(&create_test_vds("vds-1", "dvportgroup-1"));
        let network = create_test_network("primary", "tenant-a", "vds-1");

        harness
            .reconciler
            .reconcile_network(&network, at(0))
            .await
            .unwrap();

        let events = harness.writer.events();
        assert_eq!(
            events[0],
            WriteEvent::NetworkFinalizers(
                ObjectKey::new("tenant-a", "primary"),
                vec![NETWORK_PROTECTION_FINALIZER.to_string()]
            )
        );
        let status = harness.writer.last_network_status().unwrap();
        let resolved = get_condition(&status.conditions, NetworkConditionType::ProviderResolved).unwrap();
        assert_eq!(resolved.status, ConditionStatus::True);
    }

    #[tokio::test]
    async fn test_transient_provider_failure_backs_off() {
        let harness = create_test_reconciler();
        harness.store.set_unavailable(true);
        let network = create_test_network("primary", "tenant-a", "vds-1");

        let first = harness.reconciler.reconcile_network(&network, at(0)).await.unwrap();
        let second = harness.reconciler.reconcile_network(&network, at(1)).await.unwrap();
        let third = harness.reconciler.reconcile_network(&network, at(2)).await.unwrap();

        assert_eq!(first, Some(Duration::from_secs(60)));
        assert_eq!(second, Some(Duration::from_secs(60)));
        assert_eq!(third, Some(Duration::from_secs(120)));
        let status = harness.writer.last_network_status().unwrap();
        let resolved = get_condition(&status.conditions, NetworkConditionType::ProviderResolved).unwrap();
        assert_eq!(resolved.status, ConditionStatus::Unknown);

        harness.store.set_unavailable(false);
        harness.store.insert(&create_test_vds("vds-1", "dvportgroup-1"));
        let settled = harness.reconciler.reconcile_network(&network, at(3)).await.unwrap();
        assert_eq!(settled, None);
    }

    #[tokio::test]
    async fn test_deletion_waits_for_consumers() {
        let harness = create_test_reconciler();
        harness.consumers.set_consumers(vec![consumer("tenant-a", "nic-1")]);
        let network = deleting(create_test_network("primary", "tenant-a", "vds-1"), true);

        harness.reconciler.reconcile_network(&network, at(0)).await.unwrap();

        assert!(harness.writer.finalizer_writes().is_empty());
        let status = harness.writer.last_network_status().unwrap();
        let blocked = get_condition(&status.conditions, NetworkConditionType::DeletionBlocked).unwrap();
        assert_eq!(blocked.status, ConditionStatus::True);
        assert_eq!(blocked.reason, network_reasons::NETWORK_IN_USE);
    }

    #[tokio::test]
    async fn test_deletion_releases_after_status_write() {
        let harness = create_test_reconciler();
        let network = deleting(create_test_network("primary", "tenant-a", "vds-1"), true);

        let retry = harness.reconciler.reconcile_network(&network, at(0)).await.unwrap();

        assert_eq!(retry, None);
        let events = harness.writer.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], WriteEvent::NetworkStatus(..)));
        assert_eq!(
            events[1],
            WriteEvent::NetworkFinalizers(ObjectKey::new("tenant-a", "primary"), Vec::new())
        );
    }

    #[tokio::test]
    async fn test_consumer_lookup_failure_retries() {
        let harness = create_test_reconciler();
        harness.consumers.set_failing(true);
        let network = deleting(create_test_network("primary", "tenant-a", "vds-1"), true);

        let retry = harness.reconciler.reconcile_network(&network, at(0)).await.unwrap();

        assert_eq!(retry, Some(Duration::from_secs(60)));
        assert!(harness.writer.finalizer_writes().is_empty());
        let status = harness.writer.last_network_status().unwrap();
        let blocked = get_condition(&status.conditions, NetworkConditionType::DeletionBlocked).unwrap();
        assert_eq!(blocked.reason, network_reasons::CONSUMER_LOOKUP_FAILED);
    }

    #[tokio::test]
    async fn test_status_write_failure_surfaces_as_error() {
        let harness = create_test_reconciler();
        harness.writer.set_failing(true);
        let network = create_test_network("primary", "tenant-a", "vds-1");

        let result = harness.reconciler.reconcile_network(&network, at(0)).await;
        assert!(matches!(result, Err(ControllerError::Collaborator(_))));
    }

    #[tokio::test]
    async fn test_vanished_network_drops_retry_state() {
        let harness = create_test_reconciler();
        harness.store.set_unavailable(true);
        let network = create_test_network("primary", "tenant-a", "vds-1");

        harness.reconciler.reconcile_network(&network, at(0)).await.unwrap();
        harness.reconciler.reconcile_network(&network, at(1)).await.unwrap();

        harness.writer.set_vanished(true);
        let gone = harness.reconciler.reconcile_network(&network, at(2)).await.unwrap();
        assert_eq!(gone, None);

        harness.writer.set_vanished(false);
        let fresh = harness.reconciler.reconcile_network(&network, at(3)).await.unwrap();
        assert_eq!(fresh, Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_foreign_conditions_survive_reconcile() {
        let harness = create_test_reconciler();
        harness.store.insert(&create_test_vds("vds-1", "dvportgroup-1"));
        let mut network = create_test_network("primary", "tenant-a", "vds-1");
        network.status = Some(
            serde_json::from_value(serde_json::json!({
                "conditions": [{ "type": "Ready", "status": "True", "reason": "External" }]
            }))
            .unwrap(),
        );

        harness.reconciler.reconcile_network(&network, at(0)).await.unwrap();

        let status = harness.writer.last_network_status().unwrap();
        let ready = get_condition(
            &status.conditions,
            NetworkConditionType::Other("Ready".to_string()),
        )
        .unwrap();
        assert_eq!(ready.reason, "External");
        assert!(get_condition(&status.conditions, NetworkConditionType::ProviderResolved).is_some());
    }

    #[test]
    fn test_provider_condition_reasons() {
        let reference = NetworkProviderReference::vsphere_distributed("vds-1");

        let unsupported = provider_condition(
            &reference,
            &Err(ResolveError::UnsupportedKind {
                group: "g".to_string(),
                kind: "K".to_string(),
            }),
        );
        assert_eq!(unsupported.status, ConditionStatus::False);
        assert_eq!(unsupported.reason, network_reasons::UNSUPPORTED_PROVIDER);

        let decode = provider_condition(
            &reference,
            &Err(ResolveError::Decode {
                target: "t".to_string(),
                message: "bad".to_string(),
            }),
        );
        assert_eq!(decode.status, ConditionStatus::Unknown);
    }
}
