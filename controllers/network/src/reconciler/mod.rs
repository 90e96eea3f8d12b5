//! Reconciliation logic for network resources.
//!
//! - `network`: finalizer protection, deletion guard and provider resolution for `Network`
//! - `vsphere_distributed_network`: port config and IP configuration status for
//!   `VSphereDistributedNetwork`
//!
//! Reconcilers never mutate the objects they are given. They compute the new
//! controller-owned fields and hand them to a [`StatusWriter`].

pub mod network;
pub mod vsphere_distributed_network;

use crate::backoff::BackoffTracker;
use crate::collaborators::{ConsumerLister, StatusWriter};
use crate::error::{CollaboratorError, ControllerError};
use crate::port_config::PortConfigPolicy;
use crate::resolver::ReferenceResolver;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use vsphere_client::PortGroupClientTrait;

/// Reconciles Network and VSphereDistributedNetwork resources.
pub struct Reconciler {
    pub(crate) port_groups: Arc<dyn PortGroupClientTrait>,
    pub(crate) consumers: Arc<dyn ConsumerLister>,
    pub(crate) resolver: ReferenceResolver,
    pub(crate) writer: Arc<dyn StatusWriter>,
    pub(crate) policy: PortConfigPolicy,
    /// Failure history per object ("Kind/namespace/name")
    backoff: BackoffTracker,
}

impl Reconciler {
    /// Reconciler over the given collaborators
    pub fn new(
        port_groups: Arc<dyn PortGroupClientTrait>,
        consumers: Arc<dyn ConsumerLister>,
        resolver: ReferenceResolver,
        writer: Arc<dyn StatusWriter>,
        policy: PortConfigPolicy,
    ) -> Self {
        Self {
            port_groups,
            consumers,
            resolver,
            writer,
            policy,
            backoff: BackoffTracker::new(),
        }
    }

    /// Next retry delay for a failed pass on `resource_key`
    pub fn retry_delay(&self, resource_key: &str) -> Duration {
        self.backoff.record_failure(resource_key)
    }

    /// Reset the retry sequence of `resource_key` after a clean pass
    pub fn reset_error(&self, resource_key: &str) {
        self.backoff.record_success(resource_key);
    }

    /// Check a write result. `Ok(false)` means the object is gone: its retry
    /// state is dropped and the pass should end.
    pub(crate) fn written(
        &self,
        resource_key: &str,
        result: Result<(), CollaboratorError>,
    ) -> Result<bool, ControllerError> {
        match result {
            Ok(()) => Ok(true),
            Err(CollaboratorError::NotFound(what)) => {
                debug!("{} disappeared during reconciliation", what);
                self.reset_error(resource_key);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Finish a pass: back off if it must be retried, otherwise reset
    pub(crate) fn settle(&self, resource_key: &str, needs_retry: bool) -> Option<Duration> {
        if needs_retry {
            Some(self.retry_delay(resource_key))
        } else {
            self.reset_error(resource_key);
            None
        }
    }
}

/// Backoff key for an object
pub fn resource_key(kind: &str, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}/{}/{}", kind, ns, name),
        None => format!("{}/{}", kind, name),
    }
}
