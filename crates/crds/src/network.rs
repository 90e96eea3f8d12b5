//! Network CRD
//!
//! A `Network` describes the type and common attributes of a network available in
//! a namespace and points at the provider object that implements it.
//! `NetworkInterface` resources reference a `Network` by name.

use crate::conditions::{ConditionStatus, StatusCondition};
use crate::references::NetworkProviderReference;
use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Finalizer that keeps a `Network` alive until no `NetworkInterface` uses it
pub const NETWORK_PROTECTION_FINALIZER: &str = "network.netoperator.vmware.com/network-protection";

/// Desired state of a Network
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "netoperator.vmware.com",
    version = "v1alpha1",
    kind = "Network",
    namespaced,
    status = "NetworkStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// Network type (nsx-t, vsphere-distributed, nsx-t_vpc)
    #[serde(rename = "type")]
    pub type_: NetworkType,

    /// Provider object implementing this network. Immutable after creation.
    pub provider_ref: NetworkProviderReference,

    /// DNS server IPs for interfaces on this network
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,

    /// DNS search domains for interfaces on this network
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_search_domains: Vec<String>,

    /// NTP server names or IPs for this network
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ntp: Vec<String>,
}

/// Supported network types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum NetworkType {
    /// NSX-T segment
    #[serde(rename = "nsx-t")]
    NsxT,
    /// vSphere Distributed PortGroup
    #[serde(rename = "vsphere-distributed")]
    VSphereDistributed,
    /// NSX-T VPC subnet
    #[serde(rename = "nsx-t_vpc")]
    NsxTVpc,
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NsxT => write!(f, "nsx-t"),
            Self::VSphereDistributed => write!(f, "vsphere-distributed"),
            Self::NsxTVpc => write!(f, "nsx-t_vpc"),
        }
    }
}

/// Observed state of a Network
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    /// Current observed network conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<NetworkCondition>,
}

/// Network condition types
///
/// The wire type is an open string: conditions written by other actors decode as
/// `Other` and are carried through status updates unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkConditionType {
    /// The Network cannot be deleted because consumers may still use it
    DeletionBlocked,
    /// Whether `spec.providerRef` resolves to an existing provider object
    ProviderResolved,
    /// Condition type not managed by this controller
    Other(String),
}

impl From<String> for NetworkConditionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DeletionBlocked" => Self::DeletionBlocked,
            "ProviderResolved" => Self::ProviderResolved,
            _ => Self::Other(value),
        }
    }
}

impl From<NetworkConditionType> for String {
    fn from(kind: NetworkConditionType) -> Self {
        match kind {
            NetworkConditionType::DeletionBlocked => "DeletionBlocked".to_string(),
            NetworkConditionType::ProviderResolved => "ProviderResolved".to_string(),
            NetworkConditionType::Other(other) => other,
        }
    }
}

/// Machine-readable reasons used on Network conditions
pub mod network_reasons {
    /// Deletion blocked: NetworkInterfaces still reference the Network
    pub const NETWORK_IN_USE: &str = "NetworkInUse";
    /// Deletion blocked: the consumer lookup failed, so usage is unknown
    pub const CONSUMER_LOOKUP_FAILED: &str = "ConsumerLookupFailed";
    /// Deletion unblocked: no consumers remain
    pub const NO_CONSUMERS: &str = "NoConsumers";
    /// Provider reference resolved
    pub const PROVIDER_FOUND: &str = "ProviderFound";
    /// Provider reference is dangling
    pub const PROVIDER_NOT_FOUND: &str = "ProviderNotFound";
    /// Provider lookup failed for a transient reason
    pub const PROVIDER_LOOKUP_FAILED: &str = "ProviderLookupFailed";
    /// Provider group/kind/version is not served by this controller
    pub const UNSUPPORTED_PROVIDER: &str = "UnsupportedProvider";
}

/// State of a Network at a certain point
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCondition {
    /// Condition type
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub type_: NetworkConditionType,

    /// True, False or Unknown
    pub status: ConditionStatus,

    /// Time of the last status change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Machine-readable reason for the last transition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable details
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl NetworkCondition {
    /// Build a condition; the ledger stamps the transition time.
    pub fn new(
        type_: NetworkConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_,
            status,
            last_transition_time: None,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

impl StatusCondition for NetworkCondition {
    type Kind = NetworkConditionType;

    fn kind(&self) -> &NetworkConditionType { &self.type_ }
    fn status(&self) -> ConditionStatus { self.status }
    fn reason(&self) -> &str { &self.reason }
    fn message(&self) -> &str { &self.message }
    fn last_transition_time(&self) -> Option<DateTime<Utc>> { self.last_transition_time }
    fn set_last_transition_time(&mut self, at: DateTime<Utc>) { self.last_transition_time = Some(at); }
}

impl Network {
    /// Whether the protection finalizer is present
    pub fn has_protection_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|name| name == NETWORK_PROTECTION_FINALIZER))
    }

    /// Whether a delete request has been accepted by the API server
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Current conditions, empty when no status has been written yet
    pub fn conditions(&self) -> &[NetworkCondition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}
