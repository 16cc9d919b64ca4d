//! In-memory collaborator fakes shared by the integration tests.
//!
//! `FakeStore`, `FakeMetadata` and `FakeInfra` implement the three
//! capability traits over plain maps. A shared `owner_up` flag links the
//! store to the infrastructure fake: stopping the owning container makes
//! store reads fail, the way an RF=1 cluster behaves when its only
//! replica goes away.

use async_trait::async_trait;
use parking_lot::Mutex;
use ringfault::error::{Result, RingfaultError};
use ringfault::infra::{HealthStatus, InfrastructureControl};
use ringfault::store::{ClusterMetadata, StoreSession, TestRecord};
use ringfault::types::{
    ClusterTopologySnapshot, NodeAddress, NodeDescriptor, PartitionToken, UnitId,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Store fake: records and token-query answers held in maps, with reads
/// failing whenever the linked owner container is down.
pub struct FakeStore {
    pub records: Mutex<HashMap<String, TestRecord>>,
    pub query_tokens: Mutex<HashMap<String, PartitionToken>>,
    pub created_keyspaces: Mutex<Vec<(String, u32)>>,
    pub owner_up: Arc<AtomicBool>,
}

impl FakeStore {
    pub fn new(owner_up: Arc<AtomicBool>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            query_tokens: Mutex::new(HashMap::new()),
            created_keyspaces: Mutex::new(Vec::new()),
            owner_up,
        }
    }

    pub fn with_query_token(self, key: &str, token: PartitionToken) -> Self {
        self.query_tokens.lock().insert(key.to_string(), token);
        self
    }

    fn check_owner_up(&self) -> Result<()> {
        if self.owner_up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RingfaultError::Query(
                "cannot achieve consistency level ONE".to_string(),
            ))
        }
    }
}

#[async_trait]
impl StoreSession for FakeStore {
    async fn create_keyspace(&self, keyspace: &str, replication_factor: u32) -> Result<()> {
        self.created_keyspaces
            .lock()
            .push((keyspace.to_string(), replication_factor));
        Ok(())
    }

    async fn create_table(&self, _keyspace: &str, _table: &str) -> Result<()> {
        Ok(())
    }

    async fn insert_record(
        &self,
        _keyspace: &str,
        _table: &str,
        record: &TestRecord,
    ) -> Result<()> {
        self.records.lock().insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn fetch_record(
        &self,
        _keyspace: &str,
        _table: &str,
        id: &str,
    ) -> Result<Option<TestRecord>> {
        self.check_owner_up()?;
        Ok(self.records.lock().get(id).cloned())
    }

    async fn partition_token(
        &self,
        _keyspace: &str,
        _table: &str,
        key: &str,
    ) -> Result<Option<PartitionToken>> {
        self.check_owner_up()?;
        Ok(self.query_tokens.lock().get(key).copied())
    }
}

/// Metadata fake: a fixed snapshot plus a per-keyspace ring-walk answer,
/// with call counters for precondition assertions.
pub struct FakeMetadata {
    pub snapshot: Mutex<ClusterTopologySnapshot>,
    pub owners: Mutex<HashMap<String, Vec<NodeDescriptor>>>,
    pub ring_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
}

impl FakeMetadata {
    pub fn new(snapshot: ClusterTopologySnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            owners: Mutex::new(HashMap::new()),
            ring_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
        }
    }

    pub fn with_owners(self, keyspace: &str, owners: Vec<NodeDescriptor>) -> Self {
        self.owners.lock().insert(keyspace.to_string(), owners);
        self
    }

    pub fn ring_call_count(&self) -> u32 {
        self.ring_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterMetadata for FakeMetadata {
    async fn snapshot(&self) -> Result<ClusterTopologySnapshot> {
        Ok(self.snapshot.lock().clone())
    }

    async fn ring_owners(
        &self,
        keyspace: &str,
        _token: PartitionToken,
    ) -> Result<Vec<NodeDescriptor>> {
        self.ring_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .owners
            .lock()
            .get(keyspace)
            .cloned()
            .unwrap_or_default())
    }

    async fn refresh(&self) -> Result<()> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Infrastructure fake: container addresses in a map, with stop/start
/// toggling the shared `owner_up` flag.
pub struct FakeInfra {
    pub addresses: Mutex<HashMap<UnitId, NodeAddress>>,
    pub failing: Mutex<HashSet<UnitId>>,
    pub stopped: Mutex<HashSet<UnitId>>,
    pub owner_up: Arc<AtomicBool>,
}

impl FakeInfra {
    pub fn new(owner_up: Arc<AtomicBool>) -> Self {
        Self {
            addresses: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            stopped: Mutex::new(HashSet::new()),
            owner_up,
        }
    }

    pub fn with_unit(self, name: &str, address: &str) -> Self {
        self.addresses
            .lock()
            .insert(UnitId::from(name), NodeAddress::from(address));
        self
    }

    /// Make address probes for this unit fail with an error.
    pub fn with_failing_unit(self, name: &str) -> Self {
        self.failing.lock().insert(UnitId::from(name));
        self
    }
}

#[async_trait]
impl InfrastructureControl for FakeInfra {
    async fn current_address(&self, unit: &UnitId) -> Result<Option<NodeAddress>> {
        if self.failing.lock().contains(unit) {
            return Err(RingfaultError::Infrastructure(format!(
                "inspect failed for {}",
                unit
            )));
        }
        if self.stopped.lock().contains(unit) {
            return Ok(None);
        }
        Ok(self.addresses.lock().get(unit).cloned())
    }

    async fn stop(&self, unit: &UnitId) -> Result<()> {
        self.stopped.lock().insert(unit.clone());
        self.owner_up.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&self, unit: &UnitId) -> Result<()> {
        self.stopped.lock().remove(unit);
        self.owner_up.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn health_status(&self, unit: &UnitId) -> Result<Option<HealthStatus>> {
        if self.stopped.lock().contains(unit) {
            Ok(Some(HealthStatus::Starting))
        } else {
            Ok(Some(HealthStatus::Healthy))
        }
    }

    async fn is_running(&self, unit: &UnitId) -> Result<bool> {
        Ok(!self.stopped.lock().contains(unit))
    }
}

pub const MURMUR3: &str = "org.apache.cassandra.dht.Murmur3Partitioner";

/// Three-node snapshot with one RF=1 keyspace, the shape every
/// experiment scenario starts from.
pub fn three_node_snapshot(keyspace: &str) -> ClusterTopologySnapshot {
    ClusterTopologySnapshot {
        partitioner: MURMUR3.to_string(),
        nodes: vec![
            NodeDescriptor::new("10.0.0.1"),
            NodeDescriptor::new("10.0.0.2"),
            NodeDescriptor::new("10.0.0.3"),
        ],
        keyspaces: HashMap::from([(
            keyspace.to_string(),
            ringfault::types::ReplicationMetadata::simple(1),
        )]),
        has_token_map: true,
    }
}
