//! PortGroupClient trait for mocking
//!
//! The concrete `VSphereClient` implements this trait; tests use `MockVSphereClient`.

use crate::error::VSphereError;
use crate::models::PortGroupInfo;

/// Port-group query operations used by the network controller
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait PortGroupClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the session token
    async fn validate_token(&self) -> Result<(), VSphereError>;

    /// Fetch VLAN and IP pool utilization for a port-group
    async fn query_port_group(&self, port_group_id: &str) -> Result<PortGroupInfo, VSphereError>;
}
