//! VSphereDistributedNetwork reconciliation.

use super::{resource_key, Reconciler};
use crate::error::ControllerError;
use crate::port_config::reconcile_port_config;
use chrono::{DateTime, Utc};
use crds::{
    join_field_errors, set_condition, validate_spec, vds_reasons, ConditionStatus,
    VSphereDistributedNetwork, VSphereDistributedNetworkCondition,
    VSphereDistributedNetworkConditionType, VSphereDistributedNetworkSpec,
};
use std::time::Duration;
use tracing::{debug, info, warn};
use vsphere_client::VSphereError;

/// `IPPoolInvalid` condition for a spec
pub fn ip_config_condition(spec: &VSphereDistributedNetworkSpec) -> VSphereDistributedNetworkCondition {
    let errors = validate_spec(spec);
    if errors.is_empty() {
        VSphereDistributedNetworkCondition::new(
            VSphereDistributedNetworkConditionType::IPPoolInvalid,
            ConditionStatus::False,
            vds_reasons::VALID_IP_CONFIG,
            "",
        )
    } else {
        VSphereDistributedNetworkCondition::new(
            VSphereDistributedNetworkConditionType::IPPoolInvalid,
            ConditionStatus::True,
            vds_reasons::INVALID_IP_CONFIG,
            join_field_errors(&errors),
        )
    }
}

impl Reconciler {
    /// Reconcile one VSphereDistributedNetwork against its port-group.
    ///
    /// Returns a retry delay when the port-group query failed.
    pub async fn reconcile_vsphere_distributed_network(
        &self,
        network: &VSphereDistributedNetwork,
        now: DateTime<Utc>,
    ) -> Result<Option<Duration>, ControllerError> {
        let name = network.metadata.name.clone().ok_or_else(|| {
            ControllerError::InvalidResource("VSphereDistributedNetwork missing name".to_string())
        })?;
        let backoff_key = resource_key("VSphereDistributedNetwork", None, &name);
        let port_group_id = &network.spec.port_group_id;

        let query = if port_group_id.is_empty() {
            Err(VSphereError::NotFound("spec.portGroupID is empty".to_string()))
        } else {
            self.port_groups.query_port_group(port_group_id).await
        };
        if let Err(e) = &query {
            warn!(
                "Port-group {} query for VSphereDistributedNetwork {} failed: {}",
                port_group_id, name, e
            );
        }

        let mut outcome = reconcile_port_config(network, &query, &self.policy, now);
        outcome.changed |= set_condition(
            &mut outcome.status.conditions,
            ip_config_condition(&network.spec),
            now,
        );

        for condition in &outcome.asserted {
            debug!(
                "VSphereDistributedNetwork {}: {:?}={} ({})",
                name, condition.type_, condition.status, condition.reason
            );
        }

        if outcome.changed {
            info!("Updating status of VSphereDistributedNetwork {}", name);
            let result = self
                .writer
                .write_vsphere_distributed_network_status(&name, &outcome.status)
                .await;
            if !self.written(&backoff_key, result)? {
                return Ok(None);
            }
        }

        Ok(self.settle(&backoff_key, query.is_err()))
    }
}
