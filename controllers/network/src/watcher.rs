//! Kubernetes resource watchers.
//!
//! Each watched kind runs in its own `kube_runtime::Controller`, which handles
//! reconnection, debouncing and per-object serialization of reconciles. Retry
//! pacing comes from the reconciler's per-object Fibonacci backoff.

use crate::error::ControllerError;
use crate::reconciler::{resource_key, Reconciler};
use chrono::Utc;
use crds::{Network, NetworkInterface, VSphereDistributedNetwork};
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{controller::{Action, Config as ControllerConfig}, watcher, Controller};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Drive a configured controller until its stream ends.
async fn run_controller<K, F>(
    controller: Controller<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = resource_key(resource_name, obj.namespace().as_deref(), &obj.name_any());
        let delay = ctx.retry_delay(&key);
        error!("Reconciliation error for {}: {} (retrying in {:?})", key, error, delay);
        Action::requeue(delay)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            debug!("Reconciling {} {}", resource_name, obj.name_any());
            reconcile_fn(ctx, obj).await
        }
    };

    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(1))
        .concurrency(3);

    controller
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Controller error for {}: {}", resource_name, e);
            }
        })
        .await;

    Ok(())
}

/// Watches network resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    network_api: Api<Network>,
    network_interface_api: Api<NetworkInterface>,
    vsphere_distributed_network_api: Api<VSphereDistributedNetwork>,
    resync_interval: Duration,
}

impl Watcher {
    /// Watcher over the given APIs
    pub fn new(
        reconciler: Arc<Reconciler>,
        network_api: Api<Network>,
        network_interface_api: Api<NetworkInterface>,
        vsphere_distributed_network_api: Api<VSphereDistributedNetwork>,
        resync_interval: Duration,
    ) -> Self {
        Self {
            reconciler,
            network_api,
            network_interface_api,
            vsphere_distributed_network_api,
            resync_interval,
        }
    }

    /// Watches Networks, and re-runs the guard of a Network whenever one of
    /// its NetworkInterfaces changes or goes away.
    pub async fn watch_networks(&self) -> Result<(), ControllerError> {
        let controller = Controller::new(self.network_api.clone(), watcher::Config::default())
            .watches(
                self.network_interface_api.clone(),
                watcher::Config::default(),
                |nic: NetworkInterface| {
                    let namespace = nic.namespace()?;
                    if nic.spec.network_name.is_empty() {
                        return None;
                    }
                    Some(ObjectRef::new(&nic.spec.network_name).within(&namespace))
                },
            );

        run_controller(
            controller,
            self.reconciler.clone(),
            |reconciler, network: Arc<Network>| {
                Box::pin(async move {
                    match reconciler.reconcile_network(&network, Utc::now()).await? {
                        Some(delay) => Ok(Action::requeue(delay)),
                        None => Ok(Action::await_change()),
                    }
                })
            },
            "Network",
        )
        .await
    }

    /// Watches VSphereDistributedNetworks and resyncs each one periodically,
    /// since port-group changes in vCenter produce no Kubernetes events.
    pub async fn watch_vsphere_distributed_networks(&self) -> Result<(), ControllerError> {
        let controller = Controller::new(
            self.vsphere_distributed_network_api.clone(),
            watcher::Config::default(),
        );
        let resync_interval = self.resync_interval;

        run_controller(
            controller,
            self.reconciler.clone(),
            move |reconciler, network: Arc<VSphereDistributedNetwork>| {
                Box::pin(async move {
                    let delay = reconciler
                        .reconcile_vsphere_distributed_network(&network, Utc::now())
                        .await?
                        .unwrap_or(resync_interval);
                    Ok(Action::requeue(delay))
                })
            },
            "VSphereDistributedNetwork",
        )
        .await
    }
}
