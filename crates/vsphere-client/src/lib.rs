//! vSphere Distributed PortGroup Client
//!
//! Reads the authoritative VLAN configuration and IP pool utilization of a
//! distributed port-group. The network controller treats every call as a single
//! atomic operation that either returns a value or fails; retry pacing is left to
//! the controller.
//!
//! # Example
//!
//! ```no_run
//! use vsphere_client::{PortGroupClientTrait, VSphereClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = VSphereClient::new(
//!     "https://vcenter.local".to_string(),
//!     "session-token".to_string(),
//! )?;
//!
//! let info = client.query_port_group("dvportgroup-1001").await?;
//! println!("{:?}", info.vlan);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod port_group_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::VSphereClient;
pub use error::VSphereError;
pub use models::*;
pub use port_group_trait::PortGroupClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockFailure, MockVSphereClient};
