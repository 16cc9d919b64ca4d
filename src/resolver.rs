//! Ownership resolution: dual-method token computation and replica-set
//! lookup.
//!
//! The resolver answers one question — "which nodes own this key?" — in
//! two stages:
//!
//! 1. [`resolve_token`] derives the key's ring token twice, independently:
//!    from the store's own `token()` function (authoritative) and from the
//!    local Murmur3 codec (corroborating). The two are compared and the
//!    outcome logged; the query value wins whenever present.
//! 2. [`resolve_replicas`] turns the trusted token into the ordered
//!    replica set via the store's ring walk, after checking that the
//!    keyspace is known and a token map exists. No guessing, no retries:
//!    a failed precondition propagates immediately.
//!
//! [`resolve_replica_nodes`] composes the two for callers that want the
//! whole pipeline in one call.

use crate::error::{Result, RingfaultError};
use crate::partitioner;
use crate::store::{ClusterMetadata, StoreSession};
use crate::types::{PartitionToken, ReplicaSet};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Which method produced the trusted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenSource {
    /// The store's `token()` query.
    Query,
    /// The local Murmur3 computation over the raw key.
    LocalHash,
}

/// Outcome of comparing the two resolution methods.
///
/// A mismatch is diagnostic signal, never a failure: it is expected
/// whenever the table's stored key bytes differ from the raw UTF-8 of
/// the key, and the authoritative value is used regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenComparison {
    /// Both methods produced the same value.
    Match,
    /// Both methods produced values; they differ by `difference`.
    Mismatch { difference: u64 },
    /// Only the query method produced a value.
    QueryOnly,
    /// Only the local hash produced a value.
    LocalOnly,
}

/// A trusted token together with both candidate values and the
/// comparison outcome, kept for post-hoc audit of real vs. expected ring
/// placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedToken {
    pub token: PartitionToken,
    pub source: TokenSource,
    pub query_token: Option<PartitionToken>,
    pub local_token: Option<PartitionToken>,
    pub comparison: TokenComparison,
}

fn classify(
    query: Option<PartitionToken>,
    local: Option<PartitionToken>,
) -> Option<TokenComparison> {
    match (query, local) {
        (Some(q), Some(l)) if q == l => Some(TokenComparison::Match),
        (Some(q), Some(l)) => Some(TokenComparison::Mismatch {
            difference: q.abs_diff(l),
        }),
        (Some(_), None) => Some(TokenComparison::QueryOnly),
        (None, Some(_)) => Some(TokenComparison::LocalOnly),
        (None, None) => None,
    }
}

fn log_comparison(
    query: Option<PartitionToken>,
    local: Option<PartitionToken>,
    comparison: Option<TokenComparison>,
) {
    info!(
        query = query.map(|t| t.value()),
        local = local.map(|t| t.value()),
        "token calculation comparison"
    );
    match comparison {
        Some(TokenComparison::Match) => {
            info!(token = query.map(|t| t.value()), "token methods agree")
        }
        Some(TokenComparison::Mismatch { difference }) => warn!(
            query = query.map(|t| t.value()),
            local = local.map(|t| t.value()),
            difference,
            "token methods differ"
        ),
        Some(TokenComparison::QueryOnly) => info!("local token computation not available"),
        Some(TokenComparison::LocalOnly) => info!("query token not available"),
        None => error!("both token calculation methods failed"),
    }
}

/// Produce one trusted ring token for `{keyspace, table, key}`.
///
/// Step A queries the store's native `token()` function; any failure
/// (missing row, missing table, network) collapses into "authoritative
/// value unavailable" and is logged with its cause. Step B computes the
/// token locally when the partitioner is Murmur3-family. Both candidate
/// values and their comparison are logged unconditionally.
///
/// Selection precedence: query value if present, else local value, else
/// [`RingfaultError::TokenResolutionFailed`] — the component's single
/// terminal failure, which callers must treat as "cannot determine
/// ownership" and abort rather than guess.
pub async fn resolve_token<S: StoreSession>(
    store: &S,
    keyspace: &str,
    table: &str,
    key: &str,
    partitioner_name: &str,
) -> Result<ResolvedToken> {
    let query_token = match store.partition_token(keyspace, table, key).await {
        Ok(Some(token)) => {
            info!(key, %token, "token value from query");
            Some(token)
        }
        Ok(None) => {
            warn!(key, "could not get token via query: no row with this key");
            None
        }
        Err(e) => {
            warn!(key, error = %e, "could not get token via query");
            None
        }
    };

    let local_token = partitioner::compute_token(key, partitioner_name);
    if let Some(token) = local_token {
        info!(key, %token, "token value from local hash");
    }

    let comparison = classify(query_token, local_token);
    log_comparison(query_token, local_token, comparison);

    let comparison = match comparison {
        Some(comparison) => comparison,
        None => {
            return Err(RingfaultError::TokenResolutionFailed {
                key: key.to_string(),
            })
        }
    };

    let (token, source) = match (query_token, local_token) {
        (Some(token), _) => {
            info!(%token, "using token from query method");
            (token, TokenSource::Query)
        }
        (None, Some(token)) => {
            info!(%token, "using token from local hash (fallback)");
            (token, TokenSource::LocalHash)
        }
        // classify() returned Some, so at least one value exists
        (None, None) => unreachable!("comparison classified with no candidate tokens"),
    };

    Ok(ResolvedToken {
        token,
        source,
        query_token,
        local_token,
        comparison,
    })
}

/// Convert a trusted token into the replica set owning it.
///
/// Precondition checks come first and fail fast: an unknown keyspace is
/// [`RingfaultError::UnknownKeyspace`] (the ring walk is never
/// attempted), a snapshot without a token map is
/// [`RingfaultError::TopologyUnavailable`]. The walk itself is the
/// store's; this layer only converts its node objects into addresses. An
/// empty result is a valid outcome, not an error.
pub async fn resolve_replicas<M: ClusterMetadata>(
    metadata: &M,
    keyspace: &str,
    token: PartitionToken,
) -> Result<ReplicaSet> {
    let snapshot = metadata.snapshot().await?;

    if snapshot.replication_for(keyspace).is_none() {
        error!(keyspace, "keyspace not found in cluster metadata");
        return Err(RingfaultError::UnknownKeyspace(keyspace.to_string()));
    }

    if !snapshot.has_token_map {
        error!("token map not available");
        return Err(RingfaultError::TopologyUnavailable);
    }

    let owners = metadata.ring_owners(keyspace, token).await?;
    let addresses: Vec<_> = owners.into_iter().map(|node| node.address).collect();
    Ok(ReplicaSet::from(addresses))
}

/// The full pipeline: key to trusted token to owning replica set.
pub async fn resolve_replica_nodes<S: StoreSession, M: ClusterMetadata>(
    store: &S,
    metadata: &M,
    keyspace: &str,
    table: &str,
    key: &str,
) -> Result<(ResolvedToken, ReplicaSet)> {
    let snapshot = metadata.snapshot().await?;
    let resolved = resolve_token(store, keyspace, table, key, &snapshot.partitioner).await?;
    let replicas = resolve_replicas(metadata, keyspace, resolved.token).await?;
    info!(
        token = %resolved.token,
        replicas = replicas.len(),
        "resolved replica set"
    );
    Ok((resolved, replicas))
}
