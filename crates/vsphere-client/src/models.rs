//! Port-group models
//!
//! Mirrors the distributed port-group inventory payload: the default port VLAN
//! setting and the utilization of the IP pools bound to the port-group.

use serde::{Deserialize, Serialize};

/// Port-group as reported by the inventory endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PortGroupInfo {
    /// Managed object key (e.g., "dvportgroup-1001")
    pub key: String,
    /// Display name
    pub name: String,
    /// Default port VLAN setting; absent when vCenter omits it
    #[serde(default)]
    pub vlan: Option<PortGroupVlan>,
    /// One sample per IP pool bound to the port-group
    #[serde(default)]
    pub ip_pool_usage: Vec<IPPoolUsage>,
}

/// Default port VLAN setting of a distributed port-group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortGroupVlan {
    /// VmwareDistributedVirtualSwitchVlanIdSpec
    Standard { vlan_id: i32 },
    /// VmwareDistributedVirtualSwitchTrunkVlanSpec
    Trunk { ranges: Vec<NumericRange> },
    /// VmwareDistributedVirtualSwitchPvlanSpec
    Private { pvlan_id: i32 },
}

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NumericRange {
    /// First value (inclusive)
    pub start: i32,
    /// Last value (inclusive)
    pub end: i32,
}

/// Address utilization of one IP pool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct IPPoolUsage {
    /// Pool name
    pub name: String,
    /// Addresses in the pool
    pub total_addresses: u64,
    /// Addresses not allocated; may be over-reported
    pub free_addresses: u64,
}
