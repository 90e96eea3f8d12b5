//! Network Controller
//!
//! Keeps `Network` and `VSphereDistributedNetwork` resources consistent:
//! - Network: guarded by a finalizer until no NetworkInterface references it,
//!   with `providerRef` resolution reported as a condition
//! - VSphereDistributedNetwork: mirrors the port-group VLAN into
//!   `status.defaultPortConfig` and reports IP pool pressure

mod backoff;
mod collaborators;
mod config;
mod controller;
mod deletion_guard;
mod error;
mod kube_backend;
mod port_config;
mod reconciler;
mod registry;
mod resolver;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Network Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  vSphere URL: {}", config.vsphere_url);
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  IP pool pressure threshold: {}", config.pressure_threshold);
    info!("  Port config resync: {:?}", config.resync_interval);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
