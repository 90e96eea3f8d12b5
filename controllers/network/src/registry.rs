//! Provider kind registry
//!
//! The closed set of kinds a `providerRef` may point at, indexed by
//! (apiGroup, kind). Each entry records the versions that are served, the
//! default version used when a reference omits one, and whether the kind is
//! namespaced.

use crate::resolver::ResolveError;
use crds::{Network, VSphereDistributedNetwork};
use kube::core::{ApiResource, GroupVersionKind};
use kube::Resource;
use std::collections::HashMap;

/// Kinds the resolver can decode into a typed object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Decodes into `crds::Network`
    Network,
    /// Decodes into `crds::VSphereDistributedNetwork`
    VSphereDistributedNetwork,
}

/// Whether objects of a kind live in a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Looked up in the reference's namespace
    Namespaced,
    /// Looked up cluster-wide; a reference namespace is ignored
    Cluster,
}

/// One registered (apiGroup, kind)
#[derive(Debug, Clone)]
pub struct RegisteredKind {
    /// Typed target of the kind
    pub provider: ProviderKind,
    /// API group
    pub group: String,
    /// Kind name
    pub kind: String,
    /// Served versions
    pub versions: Vec<String>,
    /// Version used when a reference names none
    pub default_version: String,
    /// Namespaced or cluster-scoped
    pub scope: Scope,
}

impl RegisteredKind {
    /// Pick the version to use for a reference, falling back to the default
    pub fn select_version(&self, requested: Option<&str>) -> Result<&str, ResolveError> {
        match requested {
            None => Ok(&self.default_version),
            Some(v) => self
                .versions
                .iter()
                .find(|served| served.as_str() == v)
                .map(String::as_str)
                .ok_or_else(|| ResolveError::UnsupportedVersion {
                    group: self.group.clone(),
                    kind: self.kind.clone(),
                    version: v.to_string(),
                }),
        }
    }

    /// Dynamic API resource for `version` of this kind
    pub fn api_resource(&self, version: &str) -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(&self.group, version, &self.kind))
    }
}

/// Provider kinds keyed by (apiGroup, kind), built once at start-up
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    kinds: HashMap<(String, String), RegisteredKind>,
}

impl ProviderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `Network` and `VSphereDistributedNetwork`
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        registry.register::<Network>(ProviderKind::Network, Scope::Namespaced);
        registry.register::<VSphereDistributedNetwork>(
            ProviderKind::VSphereDistributedNetwork,
            Scope::Cluster,
        );
        registry
    }

    /// Register the group/kind/version of `K`.
    ///
    /// Registering a further version of an already known kind adds it to the
    /// served versions; the first registered version stays the default.
    pub fn register<K>(&mut self, provider: ProviderKind, scope: Scope)
    where
        K: Resource<DynamicType = ()>,
    {
        let group = K::group(&()).into_owned();
        let kind = K::kind(&()).into_owned();
        let version = K::version(&()).into_owned();

        self.kinds
            .entry((group.clone(), kind.clone()))
            .and_modify(|entry| {
                if !entry.versions.contains(&version) {
                    entry.versions.push(version.clone());
                }
            })
            .or_insert_with(|| RegisteredKind {
                provider,
                group,
                kind,
                versions: vec![version.clone()],
                default_version: version,
                scope,
            });
    }

    /// Registered entry for (group, kind), `UnsupportedKind` when absent
    pub fn lookup(&self, group: &str, kind: &str) -> Result<&RegisteredKind, ResolveError> {
        self.kinds
            .get(&(group.to_string(), kind.to_string()))
            .ok_or_else(|| ResolveError::UnsupportedKind {
                group: group.to_string(),
                kind: kind.to_string(),
            })
    }
}
