//! NetworkInterface CRD
//!
//! A `NetworkInterface` attaches a workload to a `Network` in the same namespace.
//! Only the fields the network controller reads are modelled here.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of a NetworkInterface
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "netoperator.vmware.com",
    version = "v1alpha1",
    kind = "NetworkInterface",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceSpec {
    /// Name of the `Network` this interface is attached to
    #[serde(default)]
    pub network_name: String,
}
