//! Core type definitions for the ringfault harness.
//!
//! This module contains the fundamental data types shared across the
//! harness: ring tokens, node descriptors, replica sets, and the cluster
//! topology snapshot the resolvers and the mapper operate on.
//!
//! # Key Types
//!
//! - [`PartitionToken`]: a position on the hash ring
//! - [`NodeDescriptor`]: one cluster member as seen via gossip metadata
//! - [`ClusterTopologySnapshot`]: read-only view of membership and
//!   partitioning at one point in time
//! - [`ReplicaSet`]: the ordered node addresses owning a token
//! - [`UnitId`]: an infrastructure unit (container) the harness can act on
//!
//! # Examples
//!
//! ```rust
//! use ringfault::types::{NodeAddress, NodeDescriptor, ReplicaSet};
//!
//! let node = NodeDescriptor::new("10.0.0.2").with_broadcast("172.17.0.2");
//! assert!(node.matches_address(&NodeAddress::from("172.17.0.2")));
//!
//! let replicas = ReplicaSet::from(vec![NodeAddress::from("10.0.0.2")]);
//! assert_eq!(replicas.primary().unwrap().as_str(), "10.0.0.2");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A position on the hash ring.
///
/// The ring is the full unsigned 64-bit space; values derived from the
/// 32-bit local hash occupy its low end, and signed tokens reported by
/// the store are mapped onto the ring by two's-complement wrap (see
/// [`PartitionToken::from_signed`]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct PartitionToken(pub u64);

impl PartitionToken {
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Map a signed token value (as CQL drivers report it) onto the
    /// unsigned ring.
    pub fn from_signed(value: i64) -> Self {
        Self(value as u64)
    }

    /// Absolute distance between two tokens, used when logging a
    /// mismatch between resolution methods.
    pub fn abs_diff(&self, other: PartitionToken) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for PartitionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PartitionToken {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A node network address as text.
///
/// Kept textual rather than parsed: the mapper's loose matching rules
/// must tolerate port suffixes and mixed IPv4/IPv6 representations that
/// a parsed `SocketAddr` would reject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress(String);

impl NodeAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeAddress {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeAddress {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One cluster member as seen via the store's gossip metadata.
///
/// Descriptors are a live, potentially stale mirror of membership; they
/// are refreshed only by an explicit metadata refresh and must be treated
/// as possibly out of date immediately upon use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// The address the store considers canonical for this node.
    pub address: NodeAddress,
    /// Second address some stores report; may differ from `address`
    /// under NAT.
    pub broadcast_address: Option<NodeAddress>,
    /// Whether the node is currently reachable.
    pub is_up: bool,
    /// Informational only; not used in routing decisions.
    pub rack: Option<String>,
    /// Informational only; not used in routing decisions.
    pub datacenter: Option<String>,
}

impl NodeDescriptor {
    pub fn new(address: impl Into<NodeAddress>) -> Self {
        Self {
            address: address.into(),
            broadcast_address: None,
            is_up: true,
            rack: None,
            datacenter: None,
        }
    }

    pub fn with_broadcast(mut self, address: impl Into<NodeAddress>) -> Self {
        self.broadcast_address = Some(address.into());
        self
    }

    pub fn with_rack(mut self, rack: impl Into<String>) -> Self {
        self.rack = Some(rack.into());
        self
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    pub fn down(mut self) -> Self {
        self.is_up = false;
        self
    }

    /// Exact match against either the canonical or the broadcast address.
    pub fn matches_address(&self, address: &NodeAddress) -> bool {
        &self.address == address || self.broadcast_address.as_ref() == Some(address)
    }
}

/// Replication settings for one keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationMetadata {
    /// Replication strategy class name as the store reports it.
    pub strategy_class: String,
    pub replication_factor: u32,
}

impl ReplicationMetadata {
    /// SimpleStrategy with the given replication factor.
    pub fn simple(replication_factor: u32) -> Self {
        Self {
            strategy_class: "SimpleStrategy".to_string(),
            replication_factor,
        }
    }
}

/// Read-only view of the cluster's membership and partitioning scheme at
/// one point in time.
///
/// An absent entry in `keyspaces` means "keyspace unknown", which is a
/// distinct state from a keyspace configured with zero replicas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTopologySnapshot {
    /// Hashing algorithm in use, as declared by the cluster. Not always
    /// present or canonical; drives whether local token computation is
    /// applicable at all.
    pub partitioner: String,
    /// All known members, reachable or not.
    pub nodes: Vec<NodeDescriptor>,
    /// Replication settings per keyspace.
    pub keyspaces: HashMap<String, ReplicationMetadata>,
    /// Whether the snapshot carries a usable token map. Ring walks are
    /// impossible without one.
    pub has_token_map: bool,
}

impl ClusterTopologySnapshot {
    pub fn replication_for(&self, keyspace: &str) -> Option<&ReplicationMetadata> {
        self.keyspaces.get(keyspace)
    }

    /// Find a node whose canonical or broadcast address equals `address`
    /// exactly.
    pub fn find_node(&self, address: &NodeAddress) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|n| n.matches_address(address))
    }

    pub fn up_nodes(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.nodes.iter().filter(|n| n.is_up)
    }
}

/// The ordered node addresses responsible for a token, in the store's
/// own ring-walk order.
///
/// The first entry is the natural owner. The full ordered set is exposed
/// so callers targeting a single replica make that choice explicitly
/// rather than relying on an implicit "index 0" baked in here; lists of
/// any length, including empty, are valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReplicaSet {
    addresses: Vec<NodeAddress>,
}

impl ReplicaSet {
    /// The natural owner: first node in ring-walk order, if any.
    pub fn primary(&self) -> Option<&NodeAddress> {
        self.addresses.first()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeAddress> {
        self.addresses.iter()
    }

    pub fn into_vec(self) -> Vec<NodeAddress> {
        self.addresses
    }
}

impl From<Vec<NodeAddress>> for ReplicaSet {
    fn from(addresses: Vec<NodeAddress>) -> Self {
        Self { addresses }
    }
}

/// Opaque identifier for an infrastructure unit the harness can start
/// and stop. In the shipped adapter this is a container name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UnitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
