//! vSphere client errors

use thiserror::Error;

/// Errors that can occur when querying port-groups
#[derive(Debug, Error)]
pub enum VSphereError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// vCenter returned an error or an undecodable body
    #[error("vSphere API error: {0}")]
    Api(String),

    /// Session token rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Port-group does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request was canceled or timed out before an answer arrived
    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl VSphereError {
    /// Whether the error means the port-group is known not to exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
