//! Typed object references between network resources
//!
//! Follows the Kubernetes `TypedObjectReference` pattern (apiGroup, kind, name and
//! optional namespace). References are non-owning: the target may not exist yet,
//! or may never exist, and resolving it is the controller's job.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group served by the network resources
pub const NETWORK_API_GROUP: &str = "netoperator.vmware.com";

/// API version served by the network resources
pub const NETWORK_API_VERSION: &str = "v1alpha1";

/// Kind name of the `VSphereDistributedNetwork` provider
pub const VSPHERE_DISTRIBUTED_NETWORK_KIND: &str = "VSphereDistributedNetwork";

/// Kind name of the `Network` resource
pub const NETWORK_KIND: &str = "Network";

/// Reference from a `Network` to the provider object that implements it
///
/// - `apiGroup`: API group of the provider (e.g., "netoperator.vmware.com")
/// - `kind`: provider kind (e.g., "VSphereDistributedNetwork")
/// - `name`: provider object name
/// - `namespace`: provider namespace; empty or absent means cluster scoped
/// - `apiVersion`: provider version; the registry default is used when absent
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProviderReference {
    /// API group of the referenced provider
    pub api_group: String,

    /// Kind of the referenced provider
    pub kind: String,

    /// Name of the referenced provider
    pub name: String,

    /// Namespace of the referenced provider. If empty, cluster scoped resource is assumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// API version of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl NetworkProviderReference {
    /// Reference to a cluster-scoped `VSphereDistributedNetwork`
    pub fn vsphere_distributed(name: impl Into<String>) -> Self {
        Self {
            api_group: NETWORK_API_GROUP.to_string(),
            kind: VSPHERE_DISTRIBUTED_NETWORK_KIND.to_string(),
            name: name.into(),
            namespace: None,
            api_version: Some(NETWORK_API_VERSION.to_string()),
        }
    }

    /// Namespace to look the provider up in, `None` for cluster scope.
    ///
    /// An empty string is treated the same as an absent namespace.
    pub fn scope_namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// Version requested by the reference, if any
    pub fn requested_version(&self) -> Option<&str> {
        self.api_version.as_deref().filter(|v| !v.is_empty())
    }

    /// Whether both references name the same object, treating empty optional
    /// fields as absent
    pub fn same_target(&self, other: &Self) -> bool {
        self.api_group == other.api_group
            && self.kind == other.kind
            && self.name == other.name
            && self.scope_namespace() == other.scope_namespace()
            && self.requested_version() == other.requested_version()
    }
}

impl std::fmt::Display for NetworkProviderReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scope_namespace() {
            Some(ns) => write!(f, "{}.{} {}/{}", self.kind, self.api_group, ns, self.name),
            None => write!(f, "{}.{} {}", self.kind, self.api_group, self.name),
        }
    }
}

/// Same-namespace pointer to a `Network`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkReference {
    /// Kind of the referenced resource
    pub kind: String,

    /// Name of the referenced resource
    pub name: String,

    /// API version of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl NetworkReference {
    /// Reference to a `Network` by name
    pub fn network(name: impl Into<String>) -> Self {
        Self {
            kind: NETWORK_KIND.to_string(),
            name: name.into(),
            api_version: None,
        }
    }
}

/// Reference to an IP pool used by static address assignment
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IPPoolReference {
    /// Name of the IP pool
    pub name: String,

    /// API group of the IP pool resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,

    /// Kind of the IP pool resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl IPPoolReference {
    /// Reference to a pool by name only
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_group: None,
            kind: None,
        }
    }
}
