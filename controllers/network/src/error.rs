//! Controller-specific error types.
//!
//! Validation failures live in `crds::ValidationError`; everything the
//! controller can hit while talking to its collaborators is defined here.

use crate::resolver::ResolveError;
use kube::Error as KubeError;
use thiserror::Error;
use vsphere_client::VSphereError;

/// Failure of an external collaborator call (object store, consumer listing,
/// status persistence). Always transient from the controller's point of view.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The looked-up object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// The call was canceled or timed out; the result is unknown
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur in the Network Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// vSphere API error
    #[error("vSphere error: {0}")]
    VSphere(#[from] VSphereError),

    /// Collaborator call failed
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Provider reference could not be resolved
    #[error("Reference resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Object is missing metadata the controller needs (name, namespace)
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
