//! Kubernetes-backed collaborators.

use crate::collaborators::{ConsumerLister, ConsumerRef, ObjectKey, ObjectStore, StatusWriter};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use crds::{Network, NetworkInterface, NetworkStatus, VSphereDistributedNetwork, VSphereDistributedNetworkStatus};
use kube::api::{ListParams, Patch, PatchParams};
use kube::core::{ApiResource, DynamicObject};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Lists NetworkInterfaces whose `spec.networkName` names the Network
#[derive(Clone)]
pub struct KubeConsumerLister {
    client: Client,
}

impl KubeConsumerLister {
    /// Backed by `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConsumerLister for KubeConsumerLister {
    async fn list_consumers(&self, network: &ObjectKey) -> Result<Vec<ConsumerRef>, CollaboratorError> {
        let api: Api<NetworkInterface> = Api::namespaced(self.client.clone(), &network.namespace);
        let interfaces = api.list(&ListParams::default()).await?;

        let consumers: Vec<ConsumerRef> = interfaces
            .items
            .iter()
            .filter(|nic| nic.spec.network_name == network.name)
            .map(|nic| ConsumerRef {
                kind: "NetworkInterface".to_string(),
                namespace: network.namespace.clone(),
                name: nic.name_any(),
            })
            .collect();

        debug!("Network {} has {} consumer(s)", network, consumers.len());
        Ok(consumers)
    }
}

/// Reads arbitrary objects through the dynamic API
#[derive(Clone)]
pub struct KubeObjectStore {
    client: Client,
}

impl KubeObjectStore {
    /// Backed by `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for KubeObjectStore {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, CollaboratorError> {
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        };
        api.get_opt(name)
            .await?
            .ok_or_else(|| CollaboratorError::NotFound(format!("{} {}", resource.kind, name)))
    }
}

/// A 404 on a write means the object was deleted under us.
fn write_error(target: String, e: kube::Error) -> CollaboratorError {
    match e {
        kube::Error::Api(ae) if ae.code == 404 => CollaboratorError::NotFound(target),
        other => CollaboratorError::Kube(other),
    }
}

/// Writes status and finalizers with JSON merge patches
#[derive(Clone)]
pub struct KubeStatusWriter {
    client: Client,
}

impl KubeStatusWriter {
    /// Backed by `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusWriter for KubeStatusWriter {
    async fn write_network_status(
        &self,
        network: &ObjectKey,
        status: &NetworkStatus,
    ) -> Result<(), CollaboratorError> {
        let api: Api<Network> = Api::namespaced(self.client.clone(), &network.namespace);
        let patch = json!({ "status": { "conditions": status.conditions } });
        api.patch_status(&network.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| write_error(format!("Network {}", network), e))?;
        Ok(())
    }

    async fn write_network_finalizers(
        &self,
        network: &ObjectKey,
        finalizers: &[String],
    ) -> Result<(), CollaboratorError> {
        let api: Api<Network> = Api::namespaced(self.client.clone(), &network.namespace);
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&network.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| write_error(format!("Network {}", network), e))?;
        Ok(())
    }

    async fn write_vsphere_distributed_network_status(
        &self,
        name: &str,
        status: &VSphereDistributedNetworkStatus,
    ) -> Result<(), CollaboratorError> {
        let api: Api<VSphereDistributedNetwork> = Api::all(self.client.clone());
        let patch = json!({
            "status": {
                "conditions": status.conditions,
                "defaultPortConfig": status.default_port_config,
            }
        });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| write_error(format!("VSphereDistributedNetwork {}", name), e))?;
        Ok(())
    }
}
