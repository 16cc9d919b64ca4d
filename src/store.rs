//! Store collaborator interfaces.
//!
//! The harness never speaks CQL itself; it consumes two capabilities of
//! the store client, defined here as traits so the native-driver and
//! CLI flavors of access become swappable adapters instead of duplicated
//! logic:
//!
//! - [`StoreSession`]: query execution against the live store, including
//!   the token-producing query form the resolver relies on.
//! - [`ClusterMetadata`]: topology reads (membership snapshot, ring
//!   walk) plus the explicit refresh the orchestrator invokes after
//!   container restarts. The harness core never refreshes on its own.
//!
//! Also provides [`fetch_with_retries`], the bounded polling probe the
//! orchestrator uses to observe data availability around a fault.

use crate::error::Result;
use crate::types::{ClusterTopologySnapshot, NodeDescriptor, PartitionToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// One row of the experiment's probe table
/// (`id text PRIMARY KEY, value text, timestamp timestamp`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
    pub id: String,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

impl TestRecord {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Query capability against the live store.
///
/// Implementations are expected to echo every statement they execute in
/// native CQL form (see [`render_cql`]) so experiment logs read as a
/// replayable transcript.
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// Drop the keyspace if present, then recreate it with SimpleStrategy
    /// at the given replication factor.
    async fn create_keyspace(&self, keyspace: &str, replication_factor: u32) -> Result<()>;

    /// Create the probe table if it does not exist.
    async fn create_table(&self, keyspace: &str, table: &str) -> Result<()>;

    /// Insert one probe record at consistency ONE.
    async fn insert_record(&self, keyspace: &str, table: &str, record: &TestRecord) -> Result<()>;

    /// Read one probe record by partition key at consistency ONE.
    async fn fetch_record(
        &self,
        keyspace: &str,
        table: &str,
        id: &str,
    ) -> Result<Option<TestRecord>>;

    /// The token-producing query form:
    /// `SELECT token(id) FROM <keyspace>.<table> WHERE id = ?`.
    ///
    /// The store computes the token from the row's key as stored, so this
    /// requires the row to exist; `Ok(None)` means no row. Errors cover
    /// everything else (missing table, network, timeout) and are
    /// collapsed by the resolver into "authoritative value unavailable".
    async fn partition_token(
        &self,
        keyspace: &str,
        table: &str,
        key: &str,
    ) -> Result<Option<PartitionToken>>;
}

/// Topology capability of the store client.
#[async_trait]
pub trait ClusterMetadata: Send + Sync {
    /// Current membership and partitioning view. Possibly stale; staleness
    /// is the caller's concern.
    async fn snapshot(&self) -> Result<ClusterTopologySnapshot>;

    /// The store's own ring walk: the ordered nodes owning `token` under
    /// the keyspace's replication strategy.
    async fn ring_owners(
        &self,
        keyspace: &str,
        token: PartitionToken,
    ) -> Result<Vec<NodeDescriptor>>;

    /// Explicit metadata refresh. Invoked only by the orchestrating
    /// caller, never by the resolvers.
    async fn refresh(&self) -> Result<()>;

    /// Poll the snapshot until at least `expected` nodes report up, with
    /// a census log line every attempt.
    async fn wait_for_nodes(&self, expected: usize, max_wait: Duration) -> Result<()> {
        use crate::error::RingfaultError;

        info!(expected, "waiting for cluster nodes");
        let deadline = tokio::time::Instant::now() + max_wait;

        loop {
            match self.snapshot().await {
                Ok(snapshot) => {
                    let up = snapshot.up_nodes().count();
                    info!(up, total = snapshot.nodes.len(), "cluster status");

                    if up >= expected {
                        for node in snapshot.up_nodes() {
                            info!(
                                address = %node.address,
                                broadcast = ?node.broadcast_address,
                                rack = ?node.rack,
                                datacenter = ?node.datacenter,
                                "cluster member up"
                            );
                        }
                        return Ok(());
                    }
                }
                Err(e) => info!(error = %e, "error checking cluster status"),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(RingfaultError::ClusterNotReady(format!(
                    "cluster did not reach {} nodes within {:?}",
                    expected, max_wait
                )));
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }
}

/// Render a parameterized CQL statement with its bound values inlined,
/// for logging in native, replayable form. String values are quoted with
/// single quotes doubled.
pub fn render_cql(query: &str, params: &[&str]) -> String {
    let mut rendered = String::with_capacity(query.len());
    let mut remaining = params.iter();

    for ch in query.chars() {
        if ch == '?' {
            match remaining.next() {
                Some(value) => {
                    rendered.push('\'');
                    rendered.push_str(&value.replace('\'', "''"));
                    rendered.push('\'');
                }
                None => rendered.push(ch),
            }
        } else {
            rendered.push(ch);
        }
    }
    rendered
}

/// Probe for a record with a bounded retry loop.
///
/// This is simple polling, deliberately kept out of the resolvers: a
/// probe that comes up empty is an observation, so errors and misses are
/// logged and absorbed rather than propagated. Returns the record from
/// the first successful attempt, or `None` once retries are exhausted.
pub async fn fetch_with_retries<S: StoreSession>(
    store: &S,
    keyspace: &str,
    table: &str,
    id: &str,
    max_retries: u32,
    retry_delay: Duration,
) -> Option<TestRecord> {
    let statement = format!("SELECT * FROM {}.{} WHERE id = ?", keyspace, table);

    for attempt in 1..=max_retries {
        info!(attempt, max_retries, "probing record");
        info!(target: "cql", "{}", render_cql(&statement, &[id]));

        match store.fetch_record(keyspace, table, id).await {
            Ok(Some(record)) => {
                info!(
                    id = %record.id,
                    value = %record.value,
                    timestamp = %record.timestamp,
                    "record retrieved"
                );
                return Some(record);
            }
            Ok(None) => warn!(attempt, "no data returned"),
            Err(e) => warn!(attempt, error = %e, "probe attempt failed"),
        }

        if attempt < max_retries {
            tokio::time::sleep(retry_delay).await;
        }
    }
    None
}
