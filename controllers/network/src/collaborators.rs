//! External collaborators of the reconcilers.
//!
//! Every call here crosses a process boundary, may suspend, and may fail with a
//! [`CollaboratorError`]. Kubernetes-backed implementations live in
//! `kube_backend`; in-memory doubles live in `test_utils`.

use crate::error::CollaboratorError;
use async_trait::async_trait;
use crds::{NetworkStatus, VSphereDistributedNetworkStatus};
use kube::core::{ApiResource, DynamicObject};

/// Namespaced identity of an object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Namespace of the object
    pub namespace: String,
    /// Name of the object
    pub name: String,
}

impl ObjectKey {
    /// Key for `namespace/name`
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// An object that references a Network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerRef {
    /// Kind of the consumer (e.g., `NetworkInterface`)
    pub kind: String,
    /// Namespace of the consumer, always the Network's namespace
    pub namespace: String,
    /// Name of the consumer
    pub name: String,
}

impl std::fmt::Display for ConsumerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Lists the objects that currently reference a Network
#[async_trait]
pub trait ConsumerLister: Send + Sync {
    async fn list_consumers(&self, network: &ObjectKey) -> Result<Vec<ConsumerRef>, CollaboratorError>;
}

/// Read access to arbitrary objects by group/version/kind
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one object. `namespace` is `None` for cluster-scoped lookups.
    ///
    /// Returns [`CollaboratorError::NotFound`] when no object has that name.
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, CollaboratorError>;
}

/// Persists controller-owned fields
#[async_trait]
pub trait StatusWriter: Send + Sync {
    async fn write_network_status(
        &self,
        network: &ObjectKey,
        status: &NetworkStatus,
    ) -> Result<(), CollaboratorError>;

    async fn write_network_finalizers(
        &self,
        network: &ObjectKey,
        finalizers: &[String],
    ) -> Result<(), CollaboratorError>;

    async fn write_vsphere_distributed_network_status(
        &self,
        name: &str,
        status: &VSphereDistributedNetworkStatus,
    ) -> Result<(), CollaboratorError>;
}
