//! End-to-end replication: sync gating, payload delivery, replica
//! convergence, and the concurrent-create conflict path.

use noesis_core::{Pattern, Replicator, SyncOutcome};
use noesis_e2e_tests::harness::KernelHarness;
use noesis_kernel::prelude::*;
use noesis_kernel::KernelConfig;
use serde_json::json;

fn cluster_pair() -> (KernelHarness, KernelHarness) {
    let alpha = KernelHarness::with_config(
        KernelConfig::for_node("alpha").with_peer("beta", "mem://beta"),
    );
    let beta = KernelHarness::with_config(
        KernelConfig::for_node("beta").with_peer("alpha", "mem://alpha"),
    );
    (alpha, beta)
}

fn drain(h: &mut KernelHarness) -> noesis_core::SyncPayload {
    match h.kernel.sync() {
        SyncOutcome::Synced { payload, .. } => payload,
        SyncOutcome::TooSoon => panic!("sync was gated"),
    }
}

#[test]
fn sync_is_interval_gated_and_drains_atomically() {
    let (mut alpha, _beta) = cluster_pair();
    let pid = alpha.spawn_root("A");

    alpha
        .kernel
        .syscall(pid, Syscall::Remember { key: "k1".into(), value: json!(1), importance: 0.5 })
        .unwrap();

    let payload = drain(&mut alpha);
    assert_eq!(payload.ops.len(), 1);
    assert_eq!(alpha.kernel.replicator().pending_len(), 0);

    alpha
        .kernel
        .syscall(pid, Syscall::Remember { key: "k2".into(), value: json!(2), importance: 0.5 })
        .unwrap();
    assert!(matches!(alpha.kernel.sync(), SyncOutcome::TooSoon));
    assert_eq!(alpha.kernel.replicator().pending_len(), 1, "gated sync drains nothing");

    alpha.tick_secs(6);
    let payload = drain(&mut alpha);
    assert_eq!(payload.ops.len(), 1);
}

#[test]
fn sync_delivers_to_peers_through_the_transport() {
    let (mut alpha, _beta) = cluster_pair();
    let pid = alpha.spawn_root("A");
    alpha
        .kernel
        .syscall(pid, Syscall::Think { input: "q".into(), context: json!({}) })
        .unwrap();

    drain(&mut alpha);
    let deliveries = alpha.transport.deliveries_to("beta");
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].origin, "alpha");
    assert_eq!(deliveries[0].ops.len(), 1);
}

#[test]
fn peer_outage_is_counted_not_fatal() {
    let (mut alpha, _beta) = cluster_pair();
    let pid = alpha.spawn_root("A");
    alpha
        .kernel
        .syscall(pid, Syscall::Remember { key: "k".into(), value: json!(1), importance: 0.5 })
        .unwrap();

    alpha.transport.fail_peer("beta");
    let SyncOutcome::Synced { peers_reached, peers_failed, .. } = alpha.kernel.sync() else {
        panic!();
    };
    assert_eq!(peers_reached, 0);
    assert_eq!(peers_failed, 1);
}

#[test]
fn applying_a_sync_into_a_pristine_replica_converges() {
    let (mut alpha, mut beta) = cluster_pair();
    let pid = alpha.spawn_root("A");

    alpha
        .kernel
        .syscall(pid, Syscall::Remember { key: "grail".into(), value: json!("cup"), importance: 0.9 })
        .unwrap();
    alpha
        .kernel
        .syscall(pid, Syscall::Think { input: "where?".into(), context: json!({}) })
        .unwrap();
    // A link too, so link replication is exercised.
    alpha
        .kernel
        .record_transcendence("grail", "the search is the point")
        .unwrap();

    let payload = drain(&mut alpha);
    let batch = beta.kernel.apply_remote_ops("alpha", &payload.ops);
    assert_eq!(batch.conflicts, 0);

    // Same (type, name) index on both sides.
    let names = |store: &noesis_core::AtomStore| -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = store
            .iter()
            .filter_map(|a| a.name.clone().map(|n| (a.atom_type.clone(), n)))
            .collect();
        pairs.sort();
        pairs
    };
    assert_eq!(names(alpha.kernel.store()), names(beta.kernel.store()));

    // Replicated links resolve on the receiving side.
    for atom in beta.kernel.store().iter().filter(|a| a.is_link()) {
        for target in &atom.outgoing {
            assert!(beta.kernel.store().contains(target));
        }
    }
}

#[test]
fn concurrent_creates_conflict_once_on_each_side() {
    let (mut alpha, mut beta) = cluster_pair();
    let pa = alpha.spawn_root("A");
    let pb = beta.spawn_root("B");

    alpha
        .kernel
        .syscall(pa, Syscall::Remember { key: "X".into(), value: json!("a"), importance: 0.5 })
        .unwrap();
    beta.kernel
        .syscall(pb, Syscall::Remember { key: "X".into(), value: json!("b"), importance: 0.5 })
        .unwrap();

    let from_alpha = drain(&mut alpha);
    let from_beta = drain(&mut beta);

    let at_beta = beta.kernel.apply_remote_ops("alpha", &from_alpha.ops);
    let at_alpha = alpha.kernel.apply_remote_ops("beta", &from_beta.ops);

    assert_eq!(at_beta.conflicts, 1);
    assert_eq!(at_alpha.conflicts, 1);
    assert_eq!(alpha.kernel.replicator().stats().conflicts, 1);
    assert_eq!(beta.kernel.replicator().stats().conflicts, 1);

    let count_x = |h: &KernelHarness| {
        h.kernel
            .store()
            .iter()
            .filter(|a| a.name.as_deref() == Some("X"))
            .count()
    };
    assert_eq!(count_x(&alpha), 1, "a single atom named X survives");
    assert_eq!(count_x(&beta), 1);
}

#[test]
fn newer_remote_attention_wins_the_slot_race() {
    let (mut alpha, mut beta) = cluster_pair();
    let pid = alpha.spawn_root("A");

    alpha
        .kernel
        .syscall(pid, Syscall::Remember { key: "fact".into(), value: json!(1), importance: 0.4 })
        .unwrap();
    let first = drain(&mut alpha);
    beta.kernel.apply_remote_ops("alpha", &first.ops);
    assert_eq!(
        beta.kernel.store().get_node("ConceptNode", "fact").unwrap().attention,
        0.4
    );

    // A later remember at the origin bumps alpha's slot again.
    alpha
        .kernel
        .syscall(pid, Syscall::Remember { key: "fact".into(), value: json!(1), importance: 0.9 })
        .unwrap();
    alpha.tick_secs(6);
    let second = drain(&mut alpha);
    let batch = beta.kernel.apply_remote_ops("alpha", &second.ops);
    assert_eq!(batch.applied, 1);
    assert_eq!(
        beta.kernel.store().get_node("ConceptNode", "fact").unwrap().attention,
        0.9
    );

    // Replaying the stale batch afterwards is rejected silently.
    let replay = beta.kernel.apply_remote_ops("alpha", &first.ops);
    assert_eq!(replay.applied, 0);
    assert_eq!(replay.conflicts, 1);
}

#[test]
fn distributed_query_merge_dedups_by_uuid() {
    let (mut alpha, mut beta) = cluster_pair();
    let pid = alpha.spawn_root("A");
    alpha
        .kernel
        .syscall(pid, Syscall::Remember { key: "shared".into(), value: json!(1), importance: 0.5 })
        .unwrap();

    let payload = drain(&mut alpha);
    beta.kernel.apply_remote_ops("alpha", &payload.ops);

    let pattern = Pattern::node("ConceptNode", "shared");
    let local = alpha.kernel.replicator().distributed_query(&pattern);
    let remote = beta.kernel.replicator().distributed_query(&pattern);
    assert_eq!(local.len(), 1);
    assert_eq!(remote.len(), 1);

    // The same uuid arriving from a peer folds into one result.
    let merged = Replicator::merge_remote_matches(local, remote);
    assert_eq!(merged.len(), 1);
}
