//! Test utilities for unit testing reconcilers
//!
//! In-memory collaborators plus builders for test objects.

use crate::collaborators::{ConsumerLister, ConsumerRef, ObjectKey, ObjectStore, StatusWriter};
use crate::error::CollaboratorError;
use crate::port_config::PortConfigPolicy;
use crate::reconciler::Reconciler;
use crate::registry::ProviderRegistry;
use crate::resolver::ReferenceResolver;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use crds::*;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::core::{ApiResource, DynamicObject};
use kube::Resource;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vsphere_client::{IPPoolUsage, MockVSphereClient, PortGroupInfo, PortGroupVlan};

/// Fixed test clock: `secs` seconds after a base instant
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// Helper to create a test Network backed by a VSphereDistributedNetwork
pub fn create_test_network(name: &str, namespace: &str, provider_name: &str) -> Network {
    Network {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: NetworkSpec {
            type_: NetworkType::VSphereDistributed,
            provider_ref: NetworkProviderReference::vsphere_distributed(provider_name),
            dns: vec!["10.0.0.53".to_string()],
            dns_search_domains: Vec::new(),
            ntp: Vec::new(),
        },
        status: None,
    }
}

/// Mark a Network as being deleted, with or without the protection finalizer
pub fn deleting(mut network: Network, with_finalizer: bool) -> Network {
    let timestamp: Time = serde_json::from_value(serde_json::json!("2023-11-14T22:13:20Z")).unwrap();
    network.metadata.deletion_timestamp = Some(timestamp);
    network.metadata.finalizers = if with_finalizer {
        Some(vec![NETWORK_PROTECTION_FINALIZER.to_string()])
    } else {
        None
    };
    network
}

/// Helper to create a test VSphereDistributedNetwork using DHCP
pub fn create_test_vds(name: &str, port_group_id: &str) -> VSphereDistributedNetwork {
    VSphereDistributedNetwork::new(
        name,
        VSphereDistributedNetworkSpec {
            port_group_id: port_group_id.to_string(),
            ip_assignment_mode: Some(IPAssignmentMode::Dhcp),
            ..Default::default()
        },
    )
}

pub fn consumer(namespace: &str, name: &str) -> ConsumerRef {
    ConsumerRef {
        kind: "NetworkInterface".to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

pub fn port_group(key: &str, vlan: Option<PortGroupVlan>, pools: Vec<IPPoolUsage>) -> PortGroupInfo {
    PortGroupInfo {
        key: key.to_string(),
        name: format!("{}-name", key),
        vlan,
        ip_pool_usage: pools,
    }
}

pub fn pool(name: &str, total: u64, free: u64) -> IPPoolUsage {
    IPPoolUsage {
        name: name.to_string(),
        total_addresses: total,
        free_addresses: free,
    }
}

/// Consumer lister returning a fixed list, or failing on demand
#[derive(Clone, Default)]
pub struct StaticConsumerLister {
    consumers: Arc<Mutex<Vec<ConsumerRef>>>,
    failing: Arc<Mutex<bool>>,
    calls: Arc<Mutex<u32>>,
}

impl StaticConsumerLister {
    pub fn new(consumers: Vec<ConsumerRef>) -> Self {
        let lister = Self::default();
        lister.set_consumers(consumers);
        lister
    }

    pub fn set_consumers(&self, consumers: Vec<ConsumerRef>) {
        *self.consumers.lock().unwrap() = consumers;
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ConsumerLister for StaticConsumerLister {
    async fn list_consumers(&self, _network: &ObjectKey) -> Result<Vec<ConsumerRef>, CollaboratorError> {
        *self.calls.lock().unwrap() += 1;
        if *self.failing.lock().unwrap() {
            return Err(CollaboratorError::Unavailable("consumer list timed out".to_string()));
        }
        Ok(self.consumers.lock().unwrap().clone())
    }
}

/// Object store backed by a map of (kind, namespace, name)
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<Mutex<HashMap<(String, Option<String>, String), DynamicObject>>>,
    unavailable: Arc<Mutex<bool>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K>(&self, object: &K)
    where
        K: Resource<DynamicType = ()> + serde::Serialize,
    {
        let dynamic: DynamicObject = serde_json::from_value(serde_json::to_value(object).unwrap()).unwrap();
        let key = (
            K::kind(&()).into_owned(),
            object.meta().namespace.clone(),
            object.meta().name.clone().unwrap(),
        );
        self.objects.lock().unwrap().insert(key, dynamic);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, CollaboratorError> {
        if *self.unavailable.lock().unwrap() {
            return Err(CollaboratorError::Unavailable("store unreachable".to_string()));
        }
        let key = (
            resource.kind.clone(),
            namespace.map(str::to_string),
            name.to_string(),
        );
        self.objects
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("{} {}", resource.kind, name)))
    }
}

/// A write performed through [`RecordingStatusWriter`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteEvent {
    NetworkStatus(ObjectKey, NetworkStatus),
    NetworkFinalizers(ObjectKey, Vec<String>),
    VdsStatus(String, VSphereDistributedNetworkStatus),
}

/// Status writer that records every write in order
#[derive(Clone, Default)]
pub struct RecordingStatusWriter {
    events: Arc<Mutex<Vec<WriteEvent>>>,
    failing: Arc<Mutex<bool>>,
    vanished: Arc<Mutex<bool>>,
}

impl RecordingStatusWriter {
    pub fn events(&self) -> Vec<WriteEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Answer every write as if the object had been deleted
    pub fn set_vanished(&self, vanished: bool) {
        *self.vanished.lock().unwrap() = vanished;
    }

    pub fn last_network_status(&self) -> Option<NetworkStatus> {
        self.events().into_iter().rev().find_map(|e| match e {
            WriteEvent::NetworkStatus(_, status) => Some(status),
            _ => None,
        })
    }

    pub fn last_vds_status(&self) -> Option<VSphereDistributedNetworkStatus> {
        self.events().into_iter().rev().find_map(|e| match e {
            WriteEvent::VdsStatus(_, status) => Some(status),
            _ => None,
        })
    }

    pub fn finalizer_writes(&self) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WriteEvent::NetworkFinalizers(_, finalizers) => Some(finalizers),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: WriteEvent) -> Result<(), CollaboratorError> {
        if *self.failing.lock().unwrap() {
            return Err(CollaboratorError::Unavailable("write rejected".to_string()));
        }
        if *self.vanished.lock().unwrap() {
            return Err(CollaboratorError::NotFound("object deleted".to_string()));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[async_trait]
impl StatusWriter for RecordingStatusWriter {
    async fn write_network_status(
        &self,
        network: &ObjectKey,
        status: &NetworkStatus,
    ) -> Result<(), CollaboratorError> {
        self.record(WriteEvent::NetworkStatus(network.clone(), status.clone()))
    }

    async fn write_network_finalizers(
        &self,
        network: &ObjectKey,
        finalizers: &[String],
    ) -> Result<(), CollaboratorError> {
        self.record(WriteEvent::NetworkFinalizers(network.clone(), finalizers.to_vec()))
    }

    async fn write_vsphere_distributed_network_status(
        &self,
        name: &str,
        status: &VSphereDistributedNetworkStatus,
    ) -> Result<(), CollaboratorError> {
        self.record(WriteEvent::VdsStatus(name.to_string(), status.clone()))
    }
}

/// Reconciler wired to in-memory collaborators, with handles to each of them
pub struct TestHarness {
    pub reconciler: Reconciler,
    pub port_groups: MockVSphereClient,
    pub consumers: StaticConsumerLister,
    pub store: InMemoryObjectStore,
    pub writer: RecordingStatusWriter,
}

/// Helper to create a Reconciler for testing
pub fn create_test_reconciler() -> TestHarness {
    let port_groups = MockVSphereClient::new("http://test-vcenter");
    let consumers = StaticConsumerLister::default();
    let store = InMemoryObjectStore::new();
    let writer = RecordingStatusWriter::default();

    let resolver = ReferenceResolver::new(
        Arc::new(ProviderRegistry::with_builtin_kinds()),
        Arc::new(store.clone()),
    );
    let reconciler = Reconciler::new(
        Arc::new(port_groups.clone()),
        Arc::new(consumers.clone()),
        resolver,
        Arc::new(writer.clone()),
        PortConfigPolicy::default(),
    );

    TestHarness {
        reconciler,
        port_groups,
        consumers,
        store,
        writer,
    }
}
