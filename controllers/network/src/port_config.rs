//! Port config reconciliation
//!
//! Mirrors a port-group's default VLAN into
//! `status.defaultPortConfig` and derives the `PortGroupFailure`,
//! `VlanConfigInvalid` and `IPPoolPressure` conditions. A failed query only
//! raises `PortGroupFailure`; everything observed earlier is left in place
//! until the next successful query.

use chrono::{DateTime, Utc};
use crds::{
    join_field_errors, set_condition, validate_vlan, vds_reasons, ConditionStatus,
    VSphereDistributedNetwork, VSphereDistributedNetworkCondition,
    VSphereDistributedNetworkConditionType as ConditionType, VSphereDistributedNetworkStatus,
    VSphereDistributedPortConfig, VlanSpec,
};
use vsphere_client::{IPPoolUsage, PortGroupInfo, PortGroupVlan, VSphereError};

use crate::config::DEFAULT_PRESSURE_THRESHOLD;

/// Tunables for port config reconciliation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortConfigPolicy {
    /// Free-address ratio strictly below which `IPPoolPressure` is raised
    pub pressure_threshold: f64,
}

impl Default for PortConfigPolicy {
    fn default() -> Self {
        Self {
            pressure_threshold: DEFAULT_PRESSURE_THRESHOLD,
        }
    }
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq)]
pub struct PortConfigOutcome {
    /// Status to write back
    pub status: VSphereDistributedNetworkStatus,
    /// Conditions asserted during this pass, in evaluation order
    pub asserted: Vec<VSphereDistributedNetworkCondition>,
    /// Whether `status` differs from the object's current status
    pub changed: bool,
}

/// Convert a port-group VLAN setting into its `VlanSpec` form
pub fn vlan_from_port_group(vlan: &PortGroupVlan) -> VlanSpec {
    match vlan {
        PortGroupVlan::Standard { vlan_id } => VlanSpec::standard(*vlan_id),
        PortGroupVlan::Trunk { ranges } => VlanSpec::trunk(ranges.iter().map(|r| (r.start, r.end))),
        PortGroupVlan::Private { pvlan_id } => VlanSpec::private(*pvlan_id),
    }
}

/// Aggregate free/total ratio over all pools, `None` without samples.
///
/// A pool set with zero total addresses counts as fully exhausted.
pub fn free_ratio(samples: &[IPPoolUsage]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let (free, total) = pool_totals(samples);
    if total == 0 {
        return Some(0.0);
    }
    Some(free as f64 / total as f64)
}

/// Summed `(free, total)` addresses; each pool's free count is capped at its total.
fn pool_totals(samples: &[IPPoolUsage]) -> (u64, u64) {
    samples.iter().fold((0, 0), |(free, total), s| {
        (
            free + s.free_addresses.min(s.total_addresses),
            total + s.total_addresses,
        )
    })
}

fn pressure_condition(samples: &[IPPoolUsage], threshold: f64) -> VSphereDistributedNetworkCondition {
    let Some(ratio) = free_ratio(samples) else {
        return VSphereDistributedNetworkCondition::new(
            ConditionType::IPPoolPressure,
            ConditionStatus::False,
            vds_reasons::NO_POOL_USAGE,
            "port-group reported no IP pool usage",
        );
    };

    let (free, total) = pool_totals(samples);
    let message = format!(
        "{} of {} addresses free ({:.1}%) across {} pool(s)",
        free,
        total,
        ratio * 100.0,
        samples.len()
    );

    if ratio < threshold {
        VSphereDistributedNetworkCondition::new(
            ConditionType::IPPoolPressure,
            ConditionStatus::True,
            vds_reasons::LOW_FREE_ADDRESSES,
            message,
        )
    } else {
        VSphereDistributedNetworkCondition::new(
            ConditionType::IPPoolPressure,
            ConditionStatus::False,
            vds_reasons::SUFFICIENT_FREE_ADDRESSES,
            message,
        )
    }
}

/// Reconcile the status of `network` against the outcome of a port-group query.
///
/// Pure: the query has already been performed by the caller.
pub fn reconcile_port_config(
    network: &VSphereDistributedNetwork,
    query: &Result<PortGroupInfo, VSphereError>,
    policy: &PortConfigPolicy,
    now: DateTime<Utc>,
) -> PortConfigOutcome {
    let mut status = network.status.clone().unwrap_or_default();
    let mut asserted = Vec::new();

    match query {
        Err(e) => {
            let reason = if e.is_not_found() {
                vds_reasons::PORT_GROUP_NOT_FOUND
            } else {
                vds_reasons::PORT_GROUP_QUERY_FAILED
            };
            asserted.push(VSphereDistributedNetworkCondition::new(
                ConditionType::PortGroupFailure,
                ConditionStatus::True,
                reason,
                format!("port-group {}: {}", network.spec.port_group_id, e),
            ));
        }
        Ok(info) => {
            asserted.push(VSphereDistributedNetworkCondition::new(
                ConditionType::PortGroupFailure,
                ConditionStatus::False,
                vds_reasons::PORT_GROUP_AVAILABLE,
                "",
            ));

            if let Some(vlan) = &info.vlan {
                let observed = vlan_from_port_group(vlan);
                let errors = validate_vlan(&observed);
                asserted.push(if errors.is_empty() {
                    VSphereDistributedNetworkCondition::new(
                        ConditionType::VlanConfigInvalid,
                        ConditionStatus::False,
                        vds_reasons::OBSERVED_VLAN_VALID,
                        "",
                    )
                } else {
                    VSphereDistributedNetworkCondition::new(
                        ConditionType::VlanConfigInvalid,
                        ConditionStatus::True,
                        vds_reasons::OBSERVED_VLAN_INVALID,
                        join_field_errors(&errors),
                    )
                });

                status.default_port_config = Some(VSphereDistributedPortConfig {
                    vlan: Some(observed),
                });
            }

            asserted.push(pressure_condition(&info.ip_pool_usage, policy.pressure_threshold));
        }
    }

    let mut changed = false;
    for condition in &asserted {
        changed |= set_condition(&mut status.conditions, condition.clone(), now);
    }
    changed |= network.status.as_ref().map(|s| &s.default_port_config)
        != Some(&status.default_port_config);

    PortConfigOutcome {
        status,
        asserted,
        changed,
    }
}
