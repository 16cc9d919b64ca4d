//! Integration tests for topology-to-infrastructure mapping, driven
//! through the infrastructure fake.

#[allow(dead_code)]
mod common;

use common::{three_node_snapshot, FakeInfra};
use ringfault::infra::InfrastructureControl;
use ringfault::mapper;
use ringfault::types::{NodeAddress, NodeDescriptor, UnitId};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn infra() -> FakeInfra {
    FakeInfra::new(Arc::new(AtomicBool::new(true)))
}

fn units(names: &[&str]) -> Vec<UnitId> {
    names.iter().map(|n| UnitId::from(*n)).collect()
}

#[tokio::test]
async fn direct_probe_finds_exact_address() {
    let infra = infra()
        .with_unit("cassandra-node1", "10.0.0.1")
        .with_unit("cassandra-node2", "10.0.0.2")
        .with_unit("cassandra-node3", "10.0.0.3");
    let snapshot = three_node_snapshot("experiment_rf1");

    let unit = mapper::locate_unit(
        &infra,
        &NodeAddress::from("10.0.0.2"),
        &units(&["cassandra-node1", "cassandra-node2", "cassandra-node3"]),
        &snapshot,
    )
    .await;

    assert_eq!(unit, Some(UnitId::from("cassandra-node2")));
}

#[tokio::test]
async fn list_order_beats_match_quality() {
    // node-a's address only matches the target by substring, node-b's
    // matches exactly. The scan takes whichever the caller listed first.
    let infra = infra()
        .with_unit("node-a", "10.0.0.25")
        .with_unit("node-b", "10.0.0.2");
    let snapshot = three_node_snapshot("experiment_rf1");
    let target = NodeAddress::from("10.0.0.2");

    let first_listed_substring =
        mapper::locate_unit(&infra, &target, &units(&["node-a", "node-b"]), &snapshot).await;
    assert_eq!(first_listed_substring, Some(UnitId::from("node-a")));

    let first_listed_exact =
        mapper::locate_unit(&infra, &target, &units(&["node-b", "node-a"]), &snapshot).await;
    assert_eq!(first_listed_exact, Some(UnitId::from("node-b")));
}

#[tokio::test]
async fn cross_reference_matches_via_broadcast_address() {
    // The runtime reports the docker-network address while the cluster
    // names the node by its canonical address; only the snapshot's
    // broadcast entry ties them together.
    let infra = infra()
        .with_unit("cassandra-node1", "172.17.0.1")
        .with_unit("cassandra-node2", "172.17.0.2");

    let mut snapshot = three_node_snapshot("experiment_rf1");
    snapshot.nodes = vec![
        NodeDescriptor::new("10.0.0.1").with_broadcast("172.17.0.1"),
        NodeDescriptor::new("10.0.0.2").with_broadcast("172.17.0.2"),
    ];

    let unit = mapper::locate_unit(
        &infra,
        &NodeAddress::from("10.0.0.2"),
        &units(&["cassandra-node1", "cassandra-node2"]),
        &snapshot,
    )
    .await;

    assert_eq!(unit, Some(UnitId::from("cassandra-node2")));
}

#[tokio::test]
async fn empty_candidate_list_is_unresolved() {
    let infra = infra();
    let snapshot = three_node_snapshot("experiment_rf1");

    let unit = mapper::locate_unit(&infra, &NodeAddress::from("10.0.0.2"), &[], &snapshot).await;

    assert_eq!(unit, None);
}

#[tokio::test]
async fn failing_probe_is_skipped_not_fatal() {
    let infra = infra()
        .with_unit("cassandra-node1", "10.0.0.1")
        .with_failing_unit("cassandra-node1")
        .with_unit("cassandra-node2", "10.0.0.2");
    let snapshot = three_node_snapshot("experiment_rf1");

    let unit = mapper::locate_unit(
        &infra,
        &NodeAddress::from("10.0.0.2"),
        &units(&["cassandra-node1", "cassandra-node2"]),
        &snapshot,
    )
    .await;

    assert_eq!(unit, Some(UnitId::from("cassandra-node2")));
}

#[tokio::test]
async fn target_absent_everywhere_is_unresolved() {
    let infra = infra()
        .with_unit("cassandra-node1", "172.17.0.1")
        .with_unit("cassandra-node2", "172.17.0.2");
    let snapshot = three_node_snapshot("experiment_rf1");

    // 10.0.0.9 matches no probed address and no snapshot node.
    let unit = mapper::locate_unit(
        &infra,
        &NodeAddress::from("10.0.0.9"),
        &units(&["cassandra-node1", "cassandra-node2"]),
        &snapshot,
    )
    .await;

    assert_eq!(unit, None);
}

#[tokio::test]
async fn stopped_unit_has_no_address_and_is_skipped() {
    let infra = infra()
        .with_unit("cassandra-node1", "10.0.0.1")
        .with_unit("cassandra-node2", "10.0.0.2");
    infra.stop(&UnitId::from("cassandra-node1")).await.unwrap();
    let snapshot = three_node_snapshot("experiment_rf1");

    let unit = mapper::locate_unit(
        &infra,
        &NodeAddress::from("10.0.0.2"),
        &units(&["cassandra-node1", "cassandra-node2"]),
        &snapshot,
    )
    .await;

    assert_eq!(unit, Some(UnitId::from("cassandra-node2")));
}
