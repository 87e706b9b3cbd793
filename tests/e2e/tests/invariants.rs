//! Kernel-wide invariants exercised through the public surface: PID
//! retirement, single-running discipline, reference integrity, and the
//! idempotence laws.

use noesis_e2e_tests::harness::KernelHarness;
use noesis_kernel::prelude::*;
use serde_json::{json, Value};

#[test]
fn pids_are_never_reallocated() {
    let mut h = KernelHarness::new();

    let mut seen = Vec::new();
    for generation in 0..5 {
        let pid = h.spawn_root(&format!("gen-{generation}"));
        assert!(!seen.contains(&pid), "pid {pid} was reallocated");
        seen.push(pid);
        h.kernel.kill(pid);
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}

#[test]
fn at_most_one_process_runs_at_any_moment() {
    let mut h = KernelHarness::new();
    for i in 0..6 {
        h.spawn_root(&format!("agent-{i}"));
    }

    for _ in 0..10 {
        h.kernel.schedule();
        h.tick_millis(60);
        let running = h
            .kernel
            .ps()
            .into_iter()
            .filter(|s| s.state == ProcessState::Running)
            .count();
        assert!(running <= 1);
    }
}

#[test]
fn terminated_processes_are_invisible_everywhere() {
    let mut h = KernelHarness::new();
    let pid = h.spawn_root("ghost-to-be");
    h.kernel
        .syscall(pid, Syscall::Feel { emotion: "joy".into(), intensity: 0.5 })
        .unwrap();

    h.kernel.kill(pid);

    assert!(h.kernel.ps().iter().all(|s| s.pid != pid));
    assert_eq!(h.kernel.schedule(), None);
    assert!(!h.kernel.open(&format!("/proc/{pid}")).is_found());
    assert!(!h.kernel.open(&format!("/emotion/{pid}")).is_found());

    let err = h
        .kernel
        .syscall(pid, Syscall::Think { input: "?".into(), context: Value::Null })
        .unwrap_err();
    assert_eq!(err.errno, Errno::Esrch);
}

#[test]
fn killing_a_sender_does_not_retract_delivered_thoughts() {
    let mut h = KernelHarness::new();
    let sender = h.spawn_root("sender");
    let receiver = h.spawn_root("receiver");

    h.kernel
        .syscall(sender, Syscall::SendThought { target: receiver, thought: "legacy".into() })
        .unwrap();
    h.kernel.kill(sender);

    let SyscallReply::Received { message } = h
        .kernel
        .syscall(receiver, Syscall::ReceiveThought { blocking: false })
        .unwrap()
    else {
        panic!();
    };
    let message = message.expect("the thought survives its sender");
    assert_eq!(message.from, sender);
    assert_eq!(message.payload, Value::from("legacy"));
}

#[test]
fn every_link_outgoing_resolves_after_arbitrary_work() {
    let mut h = KernelHarness::new();
    let pid = h.spawn_root("worker");

    for i in 0..10 {
        h.kernel
            .syscall(
                pid,
                Syscall::Remember {
                    key: format!("fact-{i}"),
                    value: json!(i),
                    importance: 0.1 * i as f64,
                },
            )
            .unwrap();
        h.kernel
            .syscall(pid, Syscall::Think { input: json!(i), context: Value::Null })
            .unwrap();
        h.tick_millis(3);
    }
    h.kernel.record_transcendence("fact-3", "threes matter").unwrap();
    h.kernel.record_entelechy_failure("fact-7 unreachable", 0.6).unwrap();
    h.kernel.decay_attention();

    let store = h.kernel.store();
    for atom in store.iter().filter(|a| a.is_link()) {
        assert!(!atom.outgoing.is_empty());
        for target in &atom.outgoing {
            assert!(store.contains(target), "dangling outgoing uuid");
        }
    }
}

#[test]
fn remember_twice_is_one_atom_with_the_second_values() {
    let mut h = KernelHarness::new();
    let pid = h.spawn_root("A");

    let SyscallReply::Remembered { atom: first } = h
        .kernel
        .syscall(pid, Syscall::Remember { key: "law".into(), value: json!("v1"), importance: 0.3 })
        .unwrap()
    else {
        panic!();
    };
    let SyscallReply::Remembered { atom: second } = h
        .kernel
        .syscall(pid, Syscall::Remember { key: "law".into(), value: json!("v2"), importance: 0.8 })
        .unwrap()
    else {
        panic!();
    };

    assert_eq!(first, second, "remember is idempotent by key");
    let atom = h.kernel.store().get_node("ConceptNode", "law").unwrap();
    assert_eq!(atom.attention, 0.8);
    assert_eq!(atom.truth.strength, 0.8);
    assert_eq!(atom.metadata["value"], json!("v2"));

    let all_laws = h
        .kernel
        .store()
        .query(&Pattern::node("ConceptNode", "law"));
    assert_eq!(all_laws.len(), 1);
}

#[test]
fn remember_round_trips_through_get_node() {
    let mut h = KernelHarness::new();
    let pid = h.spawn_root("A");

    h.kernel
        .syscall(
            pid,
            Syscall::Remember { key: "coordinates".into(), value: json!([48.85, 2.35]), importance: 0.7 },
        )
        .unwrap();

    let atom = h.kernel.store().get_node("ConceptNode", "coordinates").unwrap();
    assert_eq!(atom.metadata["value"], json!([48.85, 2.35]));
    assert_eq!(atom.attention, 0.7);
}

#[test]
fn version_vectors_never_run_backward() {
    let mut h = KernelHarness::new();
    let pid = h.spawn_root("A");

    let SyscallReply::Remembered { atom } = h
        .kernel
        .syscall(pid, Syscall::Remember { key: "counter".into(), value: json!(0), importance: 0.5 })
        .unwrap()
    else {
        panic!();
    };

    let mut last = 0;
    for round in 1..=4 {
        h.kernel
            .syscall(
                pid,
                Syscall::Remember { key: "counter".into(), value: json!(round), importance: 0.5 },
            )
            .unwrap();
        let slot = h.kernel.replicator().version_of(&atom).get("local");
        assert!(slot > last, "slot must grow under local mutation");
        last = slot;
    }
}

#[test]
fn blocked_means_blocked_until_unblock() {
    let mut h = KernelHarness::new();
    let pid = h.spawn_root("waiter");

    h.kernel.block(pid, "awaiting external result");
    for _ in 0..5 {
        h.tick_secs(30);
        assert_eq!(h.kernel.schedule(), None, "no timeout ever fires");
    }

    h.kernel.unblock(pid);
    assert_eq!(h.kernel.schedule(), Some(pid));
}

#[test]
fn syscall_counters_include_failures() {
    let mut h = KernelHarness::new();
    let pid = h.spawn_root("A");

    h.kernel
        .syscall(pid, Syscall::Think { input: "ok".into(), context: Value::Null })
        .unwrap();
    let _ = h.kernel.syscall(pid, Syscall::Forget { key: "missing".into(), threshold: 0.5 });
    let _ = h.kernel.syscall(777, Syscall::ReceiveThought { blocking: false });

    let stats = h.kernel.stats();
    assert_eq!(stats.syscalls, 4, "spawn + think + two failures");
    assert_eq!(
        h.kernel.ps()[0].stats.syscalls,
        2,
        "the live caller counts its own failure"
    );
}
