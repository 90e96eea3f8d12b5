//! Main controller implementation.
//!
//! Wires the Kubernetes and vSphere clients into a [`Reconciler`] and runs one
//! watcher per reconciled kind:
//! - Network: finalizer protection, deletion guard, provider resolution
//! - VSphereDistributedNetwork: port config mirroring and pool pressure

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::kube_backend::{KubeConsumerLister, KubeObjectStore, KubeStatusWriter};
use crate::port_config::PortConfigPolicy;
use crate::reconciler::Reconciler;
use crate::registry::ProviderRegistry;
use crate::resolver::ReferenceResolver;
use crate::watcher::Watcher;
use crds::{Network, NetworkInterface, VSphereDistributedNetwork};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vsphere_client::{PortGroupClientTrait, VSphereClient};

/// Main controller for network resources.
pub struct Controller {
    network_watcher: JoinHandle<Result<(), ControllerError>>,
    vsphere_distributed_network_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Network Controller");

        let kube_client = Client::try_default().await?;

        let vsphere_client = VSphereClient::new(config.vsphere_url.clone(), config.vsphere_token.clone())?;

        info!("Validating vSphere session token and connectivity...");
        vsphere_client.validate_token().await.map_err(|e| {
            error!("Failed to validate vSphere session token: {}", e);
            error!("Please ensure:");
            error!("  1. VSPHERE_TOKEN environment variable is set correctly");
            error!("  2. vCenter is reachable at {}", config.vsphere_url);
            ControllerError::VSphere(e)
        })?;
        info!("vSphere session token validated");

        let (network_api, network_interface_api): (Api<Network>, Api<NetworkInterface>) =
            match config.namespace.as_deref() {
                Some(ns) => (
                    Api::namespaced(kube_client.clone(), ns),
                    Api::namespaced(kube_client.clone(), ns),
                ),
                None => (Api::all(kube_client.clone()), Api::all(kube_client.clone())),
            };
        let vsphere_distributed_network_api: Api<VSphereDistributedNetwork> =
            Api::all(kube_client.clone());

        let resolver = ReferenceResolver::new(
            Arc::new(ProviderRegistry::with_builtin_kinds()),
            Arc::new(KubeObjectStore::new(kube_client.clone())),
        );
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(vsphere_client),
            Arc::new(KubeConsumerLister::new(kube_client.clone())),
            resolver,
            Arc::new(KubeStatusWriter::new(kube_client)),
            PortConfigPolicy {
                pressure_threshold: config.pressure_threshold,
            },
        ));

        let watcher_instance = Arc::new(Watcher::new(
            reconciler,
            network_api,
            network_interface_api,
            vsphere_distributed_network_api,
            config.resync_interval,
        ));

        let network_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_networks().await })
        };

        let vsphere_distributed_network_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_vsphere_distributed_networks().await })
        };

        Ok(Self {
            network_watcher,
            vsphere_distributed_network_watcher,
        })
    }

    /// Runs the controller until any watcher exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Network Controller running");

        tokio::select! {
            result = &mut self.network_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Network watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Network watcher error: {}", e)))?;
            }
            result = &mut self.vsphere_distributed_network_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("VSphereDistributedNetwork watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("VSphereDistributedNetwork watcher error: {}", e)))?;
            }
        }

        Ok(())
    }
}
