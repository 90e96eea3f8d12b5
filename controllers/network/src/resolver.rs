//! Reference resolution
//!
//! Turns a typed reference into the live object it names. The kind must be
//! registered in the [`ProviderRegistry`]; the object itself is fetched through
//! an [`ObjectStore`] and decoded into its typed form.
//!
//! Names are unique per (kind, namespace) in the backing store, so a lookup
//! yields at most one object.

use crate::collaborators::ObjectStore;
use crate::error::CollaboratorError;
use crate::registry::{ProviderKind, ProviderRegistry, Scope};
use crds::{
    Network, NetworkProviderReference, NetworkReference, VSphereDistributedNetwork,
    NETWORK_API_GROUP,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a reference could not be resolved
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The (group, kind) pair is not registered
    #[error("{kind}.{group} is not a supported network provider")]
    UnsupportedKind { group: String, kind: String },

    /// The kind is registered but the requested version is not served
    #[error("version {version} of {kind}.{group} is not served")]
    UnsupportedVersion {
        group: String,
        kind: String,
        version: String,
    },

    /// The referenced object does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The object store failed; the result is unknown
    #[error("lookup of {target} failed: {source}")]
    Lookup {
        target: String,
        #[source]
        source: CollaboratorError,
    },

    /// The object exists but does not decode into its typed form
    #[error("{target} could not be decoded: {message}")]
    Decode { target: String, message: String },
}

impl ResolveError {
    /// Whether retrying the same lookup later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Lookup { .. })
    }
}

/// A resolved reference target
#[derive(Debug, Clone)]
pub enum ResolvedObject {
    /// A resolved Network
    Network(Box<Network>),
    /// A resolved VSphereDistributedNetwork provider
    VSphereDistributedNetwork(Box<VSphereDistributedNetwork>),
}

/// Resolves references against a registry and an object store
#[derive(Clone)]
pub struct ReferenceResolver {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn ObjectStore>,
}

impl ReferenceResolver {
    /// Resolver over `registry` kinds, reading from `store`
    pub fn new(registry: Arc<ProviderRegistry>, store: Arc<dyn ObjectStore>) -> Self {
        Self { registry, store }
    }

    /// Resolve a Network's `providerRef`.
    ///
    /// An empty or absent namespace means a cluster-scoped lookup.
    pub async fn resolve_provider(
        &self,
        reference: &NetworkProviderReference,
    ) -> Result<ResolvedObject, ResolveError> {
        self.resolve(
            &reference.api_group,
            &reference.kind,
            reference.requested_version(),
            reference.scope_namespace(),
            &reference.name,
        )
        .await
    }

    /// Resolve a same-namespace reference to a Network
    #[allow(dead_code)] // No consumer kind carries a NetworkReference yet
    pub async fn resolve_network(
        &self,
        namespace: &str,
        reference: &NetworkReference,
    ) -> Result<ResolvedObject, ResolveError> {
        let (group, version) = split_api_version(reference.api_version.as_deref());
        self.resolve(
            group.unwrap_or(NETWORK_API_GROUP),
            &reference.kind,
            version,
            Some(namespace),
            &reference.name,
        )
        .await
    }

    async fn resolve(
        &self,
        group: &str,
        kind: &str,
        version: Option<&str>,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResolvedObject, ResolveError> {
        let registered = self.registry.lookup(group, kind)?;
        let version = registered.select_version(version)?;
        let resource = registered.api_resource(version);

        let target = match namespace {
            Some(ns) => format!("{}.{} {}/{}", kind, group, ns, name),
            None => format!("{}.{} {}", kind, group, name),
        };
        debug!("Resolving {}", target);

        // A namespaced kind never exists at cluster scope; a cluster-scoped one ignores the namespace.
        let namespace = match registered.scope {
            Scope::Namespaced if namespace.is_none() => return Err(ResolveError::NotFound(target)),
            Scope::Namespaced => namespace,
            Scope::Cluster => None,
        };

        let object = match self.store.get(&resource, namespace, name).await {
            Ok(object) => object,
            Err(CollaboratorError::NotFound(_)) => return Err(ResolveError::NotFound(target)),
            Err(source) => return Err(ResolveError::Lookup { target, source }),
        };

        let decoded = match registered.provider {
            ProviderKind::Network => object
                .try_parse::<Network>()
                .map(|n| ResolvedObject::Network(Box::new(n))),
            ProviderKind::VSphereDistributedNetwork => object
                .try_parse::<VSphereDistributedNetwork>()
                .map(|n| ResolvedObject::VSphereDistributedNetwork(Box::new(n))),
        };

        decoded.map_err(|e| ResolveError::Decode {
            target,
            message: e.to_string(),
        })
    }
}

/// Split "group/version" (or a core "version") into its parts
fn split_api_version(api_version: Option<&str>) -> (Option<&str>, Option<&str>) {
    match api_version.filter(|v| !v.is_empty()) {
        None => (None, None),
        Some(v) => match v.split_once('/') {
            Some((group, version)) => (Some(group), Some(version)),
            None => (None, Some(v)),
        },
    }
}
