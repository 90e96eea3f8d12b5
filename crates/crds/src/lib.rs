//! Network CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for `Network`, its vSphere Distributed
//! Switch provider and the `NetworkInterface` consumer, together with the
//! condition ledger and the spec validators shared by admission and the
//! controller.

pub mod conditions;
pub mod network;
pub mod network_interface;
pub mod references;
pub mod validation;
pub mod vsphere_distributed_network;

pub use conditions::*;
pub use network::*;
pub use network_interface::*;
pub use references::*;
pub use validation::*;
pub use vsphere_distributed_network::*;
