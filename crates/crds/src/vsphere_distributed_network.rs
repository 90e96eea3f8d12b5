//! VSphereDistributedNetwork CRD
//!
//! Cluster-scoped provider for networks backed by a vSphere Distributed PortGroup.
//! The port-group on the distributed switch is the source of truth for VLAN
//! configuration; the controller mirrors it into `status.defaultPortConfig`.

use crate::conditions::{ConditionStatus, StatusCondition};
use crate::references::IPPoolReference;
use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of a VSphereDistributedNetwork
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "netoperator.vmware.com",
    version = "v1alpha1",
    kind = "VSphereDistributedNetwork",
    status = "VSphereDistributedNetworkStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct VSphereDistributedNetworkSpec {
    /// Existing vSphere Distributed PortGroup identifier
    #[serde(rename = "portGroupID")]
    pub port_group_id: String,

    /// IP assignment mode for interfaces; staticpool when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub ip_assignment_mode: Option<IPAssignmentMode>,

    /// IP pools; only set for staticpool
    #[serde(default)]
    pub ip_pools: Vec<IPPoolReference>,

    /// Gateway for interfaces; only set for staticpool
    #[serde(default)]
    pub gateway: String,

    /// Subnet mask for interfaces; only set for staticpool
    #[serde(default)]
    pub subnet_mask: String,
}

impl VSphereDistributedNetworkSpec {
    /// Mode after defaulting: an unset mode means staticpool
    pub fn effective_ip_assignment_mode(&self) -> IPAssignmentMode {
        self.ip_assignment_mode
            .clone()
            .unwrap_or(IPAssignmentMode::StaticPool)
    }
}

/// How interfaces on the network get their addresses
///
/// Unrecognized strings are preserved so validation can report them instead of
/// failing deserialization of the whole object. An empty string means unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IPAssignmentMode {
    /// Addresses come from DHCP
    Dhcp,
    /// Addresses come from the referenced IP pools
    StaticPool,
    /// No address is assigned and no DHCP client is configured
    None,
    /// Value outside the supported enum
    Unrecognized(String),
}

impl From<String> for IPAssignmentMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "dhcp" => Self::Dhcp,
            "staticpool" | "" => Self::StaticPool,
            "none" => Self::None,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<IPAssignmentMode> for String {
    fn from(mode: IPAssignmentMode) -> Self {
        match mode {
            IPAssignmentMode::Dhcp => "dhcp".to_string(),
            IPAssignmentMode::StaticPool => "staticpool".to_string(),
            IPAssignmentMode::None => "none".to_string(),
            IPAssignmentMode::Unrecognized(other) => other,
        }
    }
}

impl std::fmt::Display for IPAssignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

/// VLAN configuration type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VlanType {
    /// Single VLAN ID
    Standard,
    /// Set of VLAN ID ranges
    Trunk,
    /// Private VLAN
    Private,
}

impl std::fmt::Display for VlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Trunk => write!(f, "trunk"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// Inclusive range of VLAN IDs allowed on a trunk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct VlanTrunkRange {
    /// Start of the range (inclusive)
    pub start: i32,
    /// End of the range (inclusive)
    pub end: i32,
}

/// VLAN configuration of a port
///
/// Only the field matching `type` is meaningful; the others are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VlanSpec {
    /// Which of the fields below applies
    #[serde(rename = "type")]
    pub type_: VlanType,

    /// VLAN ID for standard VLANs. 0 means no VLAN, 1-4094 a VLAN ID.
    #[serde(rename = "vlanID", default, skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<i32>,

    /// Allowed ranges for trunk VLANs. Overlapping ranges are allowed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trunk_range: Vec<VlanTrunkRange>,

    /// Private VLAN ID for private VLANs
    #[serde(rename = "privateVlanID", default, skip_serializing_if = "Option::is_none")]
    pub private_vlan_id: Option<i32>,
}

impl VlanSpec {
    /// Standard VLAN with the given ID
    pub fn standard(vlan_id: i32) -> Self {
        Self {
            type_: VlanType::Standard,
            vlan_id: Some(vlan_id),
            trunk_range: Vec::new(),
            private_vlan_id: None,
        }
    }

    /// Trunk over the given `(start, end)` ranges
    pub fn trunk(ranges: impl IntoIterator<Item = (i32, i32)>) -> Self {
        Self {
            type_: VlanType::Trunk,
            vlan_id: None,
            trunk_range: ranges
                .into_iter()
                .map(|(start, end)| VlanTrunkRange { start, end })
                .collect(),
            private_vlan_id: None,
        }
    }

    /// Private VLAN with the given ID
    pub fn private(private_vlan_id: i32) -> Self {
        Self {
            type_: VlanType::Private,
            vlan_id: None,
            trunk_range: Vec::new(),
            private_vlan_id: Some(private_vlan_id),
        }
    }
}

/// Port-level configuration of a distributed network
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VSphereDistributedPortConfig {
    /// VLAN configuration; unset until first observed from the port-group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<VlanSpec>,
}

/// Observed state of a VSphereDistributedNetwork
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VSphereDistributedNetworkStatus {
    /// Current observed conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<VSphereDistributedNetworkCondition>,

    /// Default port configuration applying to all ports unless overridden per port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_port_config: Option<VSphereDistributedPortConfig>,
}

/// VSphereDistributedNetwork condition types
///
/// Unknown wire values decode as `Other`, like [`IPAssignmentMode::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VSphereDistributedNetworkConditionType {
    /// The port-group does not exist or vCenter could not be reached
    PortGroupFailure,
    /// No valid IP pool configuration for the assignment mode
    IPPoolInvalid,
    /// The IP pools are low on free addresses
    IPPoolPressure,
    /// The observed port-group VLAN config is not a valid VlanSpec (advisory)
    VlanConfigInvalid,
    /// Condition type not managed by this controller
    Other(String),
}

impl From<String> for VSphereDistributedNetworkConditionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PortGroupFailure" => Self::PortGroupFailure,
            "IPPoolInvalid" => Self::IPPoolInvalid,
            "IPPoolPressure" => Self::IPPoolPressure,
            "VlanConfigInvalid" => Self::VlanConfigInvalid,
            _ => Self::Other(value),
        }
    }
}

impl From<VSphereDistributedNetworkConditionType> for String {
    fn from(kind: VSphereDistributedNetworkConditionType) -> Self {
        use VSphereDistributedNetworkConditionType as Kind;
        match kind {
            Kind::PortGroupFailure => "PortGroupFailure".to_string(),
            Kind::IPPoolInvalid => "IPPoolInvalid".to_string(),
            Kind::IPPoolPressure => "IPPoolPressure".to_string(),
            Kind::VlanConfigInvalid => "VlanConfigInvalid".to_string(),
            Kind::Other(other) => other,
        }
    }
}

/// Machine-readable reasons used on VSphereDistributedNetwork conditions
pub mod vds_reasons {
    /// The port-group ID is empty or unknown to vCenter
    pub const PORT_GROUP_NOT_FOUND: &str = "PortGroupNotFound";
    /// vCenter could not be queried
    pub const PORT_GROUP_QUERY_FAILED: &str = "PortGroupQueryFailed";
    /// The last port-group query succeeded
    pub const PORT_GROUP_AVAILABLE: &str = "PortGroupAvailable";
    /// IP fields do not match the assignment mode
    pub const INVALID_IP_CONFIG: &str = "InvalidIPConfiguration";
    /// IP fields match the assignment mode
    pub const VALID_IP_CONFIG: &str = "ValidIPConfiguration";
    /// Free addresses fell below the pressure threshold
    pub const LOW_FREE_ADDRESSES: &str = "LowFreeAddresses";
    /// Free addresses are at or above the pressure threshold
    pub const SUFFICIENT_FREE_ADDRESSES: &str = "SufficientFreeAddresses";
    /// The port-group reported no pool usage samples
    pub const NO_POOL_USAGE: &str = "NoPoolUsage";
    /// The observed VLAN config fails VLAN validation
    pub const OBSERVED_VLAN_INVALID: &str = "ObservedVlanInvalid";
    /// The observed VLAN config passes VLAN validation
    pub const OBSERVED_VLAN_VALID: &str = "ObservedVlanValid";
}

/// State of a VSphereDistributedNetwork at a certain point
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VSphereDistributedNetworkCondition {
    /// Condition type
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub type_: VSphereDistributedNetworkConditionType,

    /// True, False or Unknown
    pub status: ConditionStatus,

    /// Machine-readable reason for the last transition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable details
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Time of the last status change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl VSphereDistributedNetworkCondition {
    /// Build a condition; the ledger stamps the transition time.
    pub fn new(
        type_: VSphereDistributedNetworkConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_,
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: None,
        }
    }
}

impl StatusCondition for VSphereDistributedNetworkCondition {
    type Kind = VSphereDistributedNetworkConditionType;

    fn kind(&self) -> &VSphereDistributedNetworkConditionType { &self.type_ }
    fn status(&self) -> ConditionStatus { self.status }
    fn reason(&self) -> &str { &self.reason }
    fn message(&self) -> &str { &self.message }
    fn last_transition_time(&self) -> Option<DateTime<Utc>> { self.last_transition_time }
    fn set_last_transition_time(&mut self, at: DateTime<Utc>) { self.last_transition_time = Some(at); }
}
