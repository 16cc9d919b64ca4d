//! Topology-to-infrastructure mapping.
//!
//! The cluster reports node identities in its own address space; the
//! container runtime lives in another. This module reconciles the two:
//! given the address of the node to fail, find the container that hosts
//! it. Two strategies run in fixed order, never mixing results:
//!
//! 1. **Direct probe** — walk the caller-supplied candidate list, ask
//!    the runtime for each unit's current address, and take the first
//!    unit matching the target under the loose rules of
//!    [`addresses_match`]. List order is caller priority: an earlier
//!    substring match beats a later exact match.
//! 2. **Topology cross-reference** — only if the direct probe exhausts
//!    the list, look the target up in the cluster snapshot (canonical or
//!    broadcast address, exact equality) and re-probe the candidates
//!    against that node's own addresses.
//!
//! No match is the normal [`None`] outcome, not an error; the caller is
//! expected to treat it as a hard stop and log every known address for
//! manual diagnosis. Nothing is cached: each call is a fresh scan, so
//! repeated invocations after a restart see current addresses.

use crate::infra::InfrastructureControl;
use crate::types::{ClusterTopologySnapshot, NodeAddress, UnitId};
use tracing::{debug, info, warn};

/// Loose address equivalence between a cluster-reported address and an
/// infrastructure-reported one. Three sub-rules, tried in order: exact
/// equality, target contained in candidate, candidate contained in
/// target. The substring rules tolerate representation mismatches such
/// as port suffixes or IPv6/IPv4 formatting differences; they are a
/// known heuristic, not a guarantee.
pub fn addresses_match(target: &NodeAddress, candidate: &NodeAddress) -> bool {
    let t = target.as_str();
    let c = candidate.as_str();
    t == c || c.contains(t) || t.contains(c)
}

/// Probe every candidate unit and return the first whose current address
/// satisfies `accept`. Units whose address cannot be determined are
/// skipped, never aborting the scan.
async fn scan_units<I, F>(infra: &I, units: &[UnitId], accept: F) -> Option<UnitId>
where
    I: InfrastructureControl,
    F: Fn(&NodeAddress) -> bool,
{
    for unit in units {
        let address = match infra.current_address(unit).await {
            Ok(Some(address)) => address,
            Ok(None) => {
                debug!(unit = %unit, "unit has no address, skipping");
                continue;
            }
            Err(e) => {
                warn!(unit = %unit, error = %e, "could not probe unit address, skipping");
                continue;
            }
        };

        info!(unit = %unit, address = %address, "unit address");
        if accept(&address) {
            return Some(unit.clone());
        }
    }
    None
}

/// Identify which infrastructure unit hosts the node at `target`.
///
/// Returns `None` ("unresolved") when neither strategy finds a match.
/// A fresh scan every call; one address probe per candidate unit per
/// strategy.
pub async fn locate_unit<I: InfrastructureControl>(
    infra: &I,
    target: &NodeAddress,
    units: &[UnitId],
    snapshot: &ClusterTopologySnapshot,
) -> Option<UnitId> {
    info!(target = %target, candidates = units.len(), "mapping node to infrastructure unit");

    if let Some(unit) = scan_units(infra, units, |address| addresses_match(target, address)).await {
        info!(unit = %unit, target = %target, "matched unit by direct address probe");
        return Some(unit);
    }

    // Cross-reference fallback: find the node the cluster itself knows
    // under this address, then re-probe against that node's addresses
    // with exact equality.
    info!("direct probe found nothing, trying topology cross-reference");
    let node = match snapshot.find_node(target) {
        Some(node) => node,
        None => {
            info!(target = %target, "target not present in topology snapshot, mapping unresolved");
            return None;
        }
    };
    info!(
        address = %node.address,
        broadcast = ?node.broadcast_address,
        "target found in topology snapshot"
    );

    let unit = scan_units(infra, units, |address| {
        address == &node.address || Some(address) == node.broadcast_address.as_ref()
    })
    .await?;

    info!(unit = %unit, target = %target, "matched unit via topology cross-reference");
    Some(unit)
}
