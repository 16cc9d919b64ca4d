//! Error types for the ringfault harness.
//!
//! This module provides a unified error type [`RingfaultError`] for all
//! harness operations, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! - **Ownership resolution**: token resolution and replica-set lookup
//!   preconditions (`UnknownKeyspace`, `TopologyUnavailable`,
//!   `TokenResolutionFailed`)
//! - **Store**: failures from the query collaborator
//! - **Infrastructure**: container runtime command failures
//! - **Experiment**: orchestration-level aborts
//! - **Configuration**: invalid settings or missing configuration
//!
//! Two outcomes are deliberately *not* errors: the token codec fed an
//! unrecognized partitioner returns "not applicable" (`None`), and a
//! mapper scan that finds no matching container returns unresolved
//! (`None`). Callers must check for those values explicitly.

use std::io;
use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, RingfaultError>;

/// Main error type for ringfault operations.
#[derive(Error, Debug)]
pub enum RingfaultError {
    // Ownership resolution errors
    /// The keyspace is absent from cluster metadata. Replica-set
    /// resolution never guesses a replication factor.
    #[error("keyspace '{0}' not found in cluster metadata")]
    UnknownKeyspace(String),

    /// The cluster snapshot exposes no token map, so no ring walk is
    /// possible.
    #[error("cluster token map not available")]
    TopologyUnavailable,

    /// Neither the token query nor the local hash produced a value.
    /// Ownership is indeterminate; the experiment must not guess.
    #[error("both token resolution methods failed for key '{key}'")]
    TokenResolutionFailed { key: String },

    /// The authoritative token query had no answer (missing row, missing
    /// table, network failure). Internal to the resolver; always
    /// recovered by falling back to the local hash.
    #[error("token query unavailable: {0}")]
    QueryUnavailable(String),

    // Store collaborator errors
    #[error("store query failed: {0}")]
    Query(String),

    // Infrastructure collaborator errors
    #[error("infrastructure command failed: {0}")]
    Infrastructure(String),

    // Experiment orchestration errors
    #[error("cluster not ready: {0}")]
    ClusterNotReady(String),

    #[error("experiment aborted: {0}")]
    ExperimentAborted(String),

    // Configuration errors
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RingfaultError {
    /// Whether this error must abort the whole experiment run.
    ///
    /// Only `QueryUnavailable` is recoverable: the resolver falls back to
    /// the locally computed token. Everything else propagates as
    /// "ownership indeterminate" or a hard collaborator failure, and the
    /// orchestrator exits non-zero rather than act on a guessed node.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RingfaultError::QueryUnavailable(_))
    }
}
