//! Ringfault - a fault-injection harness for replication experiments
//! against Cassandra-compatible clusters.
//!
//! Ringfault answers one operational question experimentally: what
//! happens to data availability when the node holding the only replica
//! of a key is forcibly removed, and then brought back? To do that it
//! must first answer a harder question - *which* physical container
//! holds a given key - and that ownership-resolution pipeline is the
//! heart of the crate.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Node Failure Experiment                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Token Codec → Dual-Method Resolver → Replica Set Resolver  │
//! │                        → Topology/Infrastructure Mapper     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  StoreSession  │  ClusterMetadata  │  InfrastructureControl │
//! │  (CQL adapter) │  (driver metadata)│  (docker CLI adapter)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ownership resolution runs in three steps:
//!
//! 1. The key's ring token is derived twice, independently: by asking
//!    the store (`SELECT token(id) ...`) and by hashing the raw key
//!    locally with the cluster's declared Murmur3 partitioner. The two
//!    are compared and logged; the store's answer wins when present.
//! 2. The trusted token is turned into an ordered replica set via the
//!    store's own ring walk, guarded by keyspace and token-map
//!    precondition checks.
//! 3. The primary replica's address is reconciled against the container
//!    runtime's address space to find the one container to stop.
//!
//! All store and infrastructure access goes through capability traits,
//! so experiments run identically against a live cluster or in-memory
//! fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use ringfault::config::HarnessConfig;
//! use ringfault::experiment::NodeFailureExperiment;
//! use ringfault::infra::DockerCli;
//!
//! #[tokio::main]
//! async fn main() -> ringfault::Result<()> {
//!     let config = HarnessConfig::from_env()?;
//!     let experiment = NodeFailureExperiment::new(store, metadata, DockerCli::new(), config);
//!     let report = experiment.run().await?;
//!     std::process::exit(if report.hypothesis_proven() { 0 } else { 1 });
//! }
//! ```

pub mod config;
pub mod error;
pub mod experiment;
pub mod infra;
pub mod mapper;
pub mod partitioner;
pub mod resolver;
pub mod store;
pub mod types;

pub use config::HarnessConfig;
pub use error::{Result, RingfaultError};
pub use experiment::{ExperimentReport, ExperimentStatus, NodeFailureExperiment};
pub use infra::{DockerCli, HealthStatus, InfrastructureControl};
pub use resolver::{ResolvedToken, TokenComparison, TokenSource};
pub use store::{ClusterMetadata, StoreSession, TestRecord};
pub use types::{
    ClusterTopologySnapshot, NodeAddress, NodeDescriptor, PartitionToken, ReplicaSet,
    ReplicationMetadata, UnitId,
};
