//! Mock vSphere client for unit testing
//!
//! Stores port-groups in memory and can be scripted to fail the next N queries,
//! which lets tests walk a reconciler through transient outages.

use crate::error::VSphereError;
use crate::models::PortGroupInfo;
use crate::port_group_trait::PortGroupClientTrait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Failure to inject into the next query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Transport timeout or cancellation
    Timeout,
    /// vCenter answered with a server error
    Api,
    /// Port-group reported as missing
    NotFound,
}

/// Mock vSphere client for testing
#[derive(Clone, Debug)]
pub struct MockVSphereClient {
    base_url: String,
    port_groups: Arc<Mutex<HashMap<String, PortGroupInfo>>>,
    failures: Arc<Mutex<VecDeque<MockFailure>>>,
    queries: Arc<Mutex<u32>>,
}

impl MockVSphereClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            port_groups: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(VecDeque::new())),
            queries: Arc::new(Mutex::new(0)),
        }
    }

    /// Add or replace a port-group (for test setup)
    pub fn add_port_group(&self, info: PortGroupInfo) {
        self.port_groups.lock().unwrap().insert(info.key.clone(), info);
    }

    /// Remove a port-group (for test setup)
    pub fn remove_port_group(&self, key: &str) {
        self.port_groups.lock().unwrap().remove(key);
    }

    /// Fail the next `count` queries with the given failure
    pub fn fail_next(&self, failure: MockFailure, count: usize) {
        let mut failures = self.failures.lock().unwrap();
        failures.extend(std::iter::repeat_n(failure, count));
    }

    /// Number of `query_port_group` calls made so far
    pub fn query_count(&self) -> u32 {
        *self.queries.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl PortGroupClientTrait for MockVSphereClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_token(&self) -> Result<(), VSphereError> {
        Ok(())
    }

    async fn query_port_group(&self, port_group_id: &str) -> Result<PortGroupInfo, VSphereError> {
        *self.queries.lock().unwrap() += 1;

        if let Some(failure) = self.failures.lock().unwrap().pop_front() {
            return Err(match failure {
                MockFailure::Timeout => VSphereError::Timeout(format!("query {}", port_group_id)),
                MockFailure::Api => VSphereError::Api("503 Service Unavailable".to_string()),
                MockFailure::NotFound => {
                    VSphereError::NotFound(format!("Port-group {} not found", port_group_id))
                }
            });
        }

        self.port_groups
            .lock()
            .unwrap()
            .get(port_group_id)
            .cloned()
            .ok_or_else(|| VSphereError::NotFound(format!("Port-group {} not found", port_group_id)))
    }
}
